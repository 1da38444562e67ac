use crate::Error;
use core::{fmt, str::FromStr};

/// How a generator renders the IDs it mints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Base-10 digits, no padding.
    Decimal,
    /// 16 upper-case hexadecimal digits.
    Hex,
    /// 11 characters from `0-9a-zA-Z-_`, in that order.
    #[default]
    Base64Custom,
}

impl OutputFormat {
    /// Bits consumed per output character, `None` for decimal.
    pub const fn bits_per_char(self) -> Option<u32> {
        match self {
            Self::Decimal => None,
            Self::Hex => Some(4),
            Self::Base64Custom => Some(6),
        }
    }

    /// Number of characters used to render `bits` significant bits, `None`
    /// when the width depends on the value.
    pub const fn width_for(self, bits: u32) -> Option<usize> {
        match self.bits_per_char() {
            Some(bpc) => Some(bits.div_ceil(bpc) as usize),
            None => None,
        }
    }

    /// Width of an encoded 63-bit ID.
    pub const fn width(self) -> Option<usize> {
        self.width_for(crate::ID_BITS)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decimal => "decimal",
            Self::Hex => "hex",
            Self::Base64Custom => "base64",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "decimal" | "base10" => Ok(Self::Decimal),
            "hex" | "base16" => Ok(Self::Hex),
            "base64" | "base64custom" => Ok(Self::Base64Custom),
            _ => Err(Error::UnsupportedFormat {
                format: s.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_case_insensitively() {
        assert_eq!("decimal".parse(), Ok(OutputFormat::Decimal));
        assert_eq!("Base10".parse(), Ok(OutputFormat::Decimal));
        assert_eq!("HEX".parse(), Ok(OutputFormat::Hex));
        assert_eq!("base16".parse(), Ok(OutputFormat::Hex));
        assert_eq!("base64".parse(), Ok(OutputFormat::Base64Custom));
        assert_eq!("Base64Custom".parse(), Ok(OutputFormat::Base64Custom));
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = "base32".parse::<OutputFormat>().unwrap_err();
        assert_eq!(
            err,
            Error::UnsupportedFormat {
                format: "base32".to_owned()
            }
        );
    }

    #[test]
    fn display_round_trips() {
        for format in [
            OutputFormat::Decimal,
            OutputFormat::Hex,
            OutputFormat::Base64Custom,
        ] {
            assert_eq!(format.to_string().parse(), Ok(format));
        }
    }

    #[test]
    fn widths() {
        assert_eq!(OutputFormat::Hex.width(), Some(16));
        assert_eq!(OutputFormat::Base64Custom.width(), Some(11));
        assert_eq!(OutputFormat::Decimal.width(), None);
        assert_eq!(OutputFormat::Base64Custom.width_for(64), Some(11));
        assert_eq!(OutputFormat::Hex.width_for(41), Some(11));
    }

    #[test]
    fn defaults_to_base64() {
        assert_eq!(OutputFormat::default(), OutputFormat::Base64Custom);
    }
}
