//! Serial line settings.
//!
//! Every framing field is optional: an unset field is never forwarded to the
//! transport, which then keeps its own default for it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SessionError;

/// serial port baud rate
pub const COMMON_BAUD_RATES: &[u32] = &[
    115200, 57600, 38400, 19200, 9600, 4800, 2400, 1800, 1200, 600, 300, 200, 150, 134, 110, 75,
    50,
];

/// Default baud rate when nothing else is configured.
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Label used by settings widgets for an unset field.
pub const AUTO_LABEL: &str = "Auto";

/// serial port data bits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

/// serial port stop bits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    One,
    Two,
}

/// serial port parity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Even,
    Mark,
    Odd,
    Space,
}

impl DataBits {
    pub fn bits(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl StopBits {
    pub fn bits(self) -> u8 {
        match self {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

impl Parity {
    pub const ALL: [Parity; 5] = [
        Parity::None,
        Parity::Even,
        Parity::Mark,
        Parity::Odd,
        Parity::Space,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Parity::None => "none",
            Parity::Even => "even",
            Parity::Mark => "mark",
            Parity::Odd => "odd",
            Parity::Space => "space",
        }
    }
}

impl TryFrom<u8> for DataBits {
    type Error = SessionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(SessionError::invalid_config(format!(
                "data bits must be 5, 6, 7 or 8, got {other}"
            ))),
        }
    }
}

impl TryFrom<u8> for StopBits {
    type Error = SessionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(SessionError::invalid_config(format!(
                "stop bits must be 1 or 2, got {other}"
            ))),
        }
    }
}

impl FromStr for Parity {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parity::ALL
            .into_iter()
            .find(|parity| parity.as_str() == s)
            .ok_or_else(|| SessionError::invalid_config(format!("unknown parity '{s}'")))
    }
}

impl fmt::Display for DataBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a settings-widget value, where "Auto" or "undefined" leaves the
/// field unset.
///
/// ```
/// use serial_terminal::serial::options::{parse_optional, Parity};
///
/// assert_eq!(parse_optional::<Parity>("odd").unwrap(), Some(Parity::Odd));
/// assert_eq!(parse_optional::<Parity>("Auto").unwrap(), None);
/// ```
pub fn parse_optional<T>(value: &str) -> Result<Option<T>, SessionError>
where
    T: FromStr<Err = SessionError>,
{
    match value {
        "" | AUTO_LABEL | "undefined" => Ok(None),
        other => other.parse().map(Some),
    }
}

impl FromStr for DataBits {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits: u8 = s
            .parse()
            .map_err(|_| SessionError::invalid_config(format!("invalid data bits '{s}'")))?;
        DataBits::try_from(bits)
    }
}

impl FromStr for StopBits {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits: u8 = s
            .parse()
            .map_err(|_| SessionError::invalid_config(format!("invalid stop bits '{s}'")))?;
        StopBits::try_from(bits)
    }
}

/// Options a serial session is opened with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialOptions {
    pub baud_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_bits: Option<DataBits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_bits: Option<StopBits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parity: Option<Parity>,
    pub rtscts: bool,
    pub xon: bool,
    pub xoff: bool,
    pub xany: bool,
}

impl Default for SerialOptions {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: None,
            stop_bits: None,
            parity: None,
            rtscts: false,
            xon: false,
            xoff: false,
            xany: false,
        }
    }
}

impl SerialOptions {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_data_bits(mut self, data_bits: Option<DataBits>) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn with_stop_bits(mut self, stop_bits: Option<StopBits>) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub fn with_parity(mut self, parity: Option<Parity>) -> Self {
        self.parity = parity;
        self
    }

    /// Names and values of the fields that are actually set, in field order.
    pub fn defined_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("baudRate", self.baud_rate.to_string())];
        if let Some(bits) = self.data_bits {
            fields.push(("dataBits", bits.to_string()));
        }
        if let Some(bits) = self.stop_bits {
            fields.push(("stopBits", bits.to_string()));
        }
        if let Some(parity) = self.parity {
            fields.push(("parity", parity.to_string()));
        }
        for (name, flag) in [
            ("rtscts", self.rtscts),
            ("xon", self.xon),
            ("xoff", self.xoff),
            ("xany", self.xany),
        ] {
            if flag {
                fields.push((name, "true".to_string()));
            }
        }
        fields
    }
}

/// Renders only the defined fields, e.g. `{baudRate: 9600, parity: odd}`.
impl fmt::Display for SerialOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .defined_fields()
            .into_iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{{{fields}}}")
    }
}
