/// Page shift value (12 bits) for 4KB pages
pub const PAGE_SHIFT: usize = 12;
/// Standard page size (4096 bytes)
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
/// Mask for extracting page offset
pub const PAGE_MASK: usize = PAGE_SIZE - 1;

/// Number of bits in one captured data byte
pub const BITS_PER_BYTE: u8 = 8;

/// Marker rendered for statistics that do not apply
pub const NOT_APPLICABLE: &str = "N/A";
