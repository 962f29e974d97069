use crate::error::ServerError;

/// Horse coat markings, keyed by their entity-metadata code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HorseColor {
    None = 0,
    White = 1,
    WhiteField = 2,
    WhiteDots = 3,
    BlackDots = 4,
}

impl HorseColor {
    /// Every variant, indexed by its code.
    pub const ALL: [HorseColor; 5] = [
        HorseColor::None,
        HorseColor::White,
        HorseColor::WhiteField,
        HorseColor::WhiteDots,
        HorseColor::BlackDots,
    ];

    pub const fn data(self) -> i32 {
        self as i32
    }

    /// Look up a color by code. Unknown codes are an error, never a default.
    pub fn of(data: i32) -> Result<Self, ServerError> {
        usize::try_from(data)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or_else(|| ServerError::invalid(format!("no horse color with id = {data}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_code() {
        for (i, color) in HorseColor::ALL.iter().enumerate() {
            assert_eq!(color.data(), i as i32);
        }
    }

    #[test]
    fn every_code_round_trips() {
        for color in HorseColor::ALL {
            assert_eq!(HorseColor::of(color.data()).unwrap(), color);
        }
    }

    #[test]
    fn unknown_codes_are_rejected() {
        for code in [5, 99, -1, i32::MAX] {
            let err = HorseColor::of(code).unwrap_err();
            assert!(matches!(err, ServerError::InvalidArgument(_)));
        }
        assert_eq!(
            HorseColor::of(99).unwrap_err().to_string(),
            "invalid argument: no horse color with id = 99"
        );
    }
}
