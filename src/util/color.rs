//! RGBA colours for trail beams

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const BLUE: Self = Self::rgb(0, 0, 255);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const CORNFLOWER_BLUE: Self = Self::rgb(100, 149, 237);
    pub const INDIAN_RED: Self = Self::rgb(205, 92, 92);
    pub const MEDIUM_SEA_GREEN: Self = Self::rgb(60, 179, 113);
    pub const MEDIUM_ORCHID: Self = Self::rgb(186, 85, 211);
    pub const GOLD: Self = Self::rgb(255, 215, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
}
