use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Compute device both models run on.
///
/// Anything other than `cpu` is kept verbatim as an accelerator identifier
/// and interpreted by the inference backend (e.g. `cuda:1`, `coreml`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Device {
    #[default]
    Cpu,
    Accelerator(String),
}

impl FromStr for Device {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("cpu") {
            Ok(Device::Cpu)
        } else {
            Ok(Device::Accelerator(trimmed.to_string()))
        }
    }
}

impl From<String> for Device {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(device) => device,
            Err(never) => match never {},
        }
    }
}

impl From<Device> for String {
    fn from(d: Device) -> Self {
        d.to_string()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Accelerator(id) => write!(f, "{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("cpu", Device::Cpu)]
    #[case("CPU", Device::Cpu)]
    #[case("", Device::Cpu)]
    #[case("cuda", Device::Accelerator("cuda".into()))]
    #[case(" cuda:1 ", Device::Accelerator("cuda:1".into()))]
    #[case("mystery-npu", Device::Accelerator("mystery-npu".into()))]
    fn test_parse(#[case] input: &str, #[case] expected: Device) {
        assert_eq!(input.parse::<Device>().unwrap(), expected);
    }

    #[test]
    fn test_default_is_cpu() {
        assert_eq!(Device::default(), Device::Cpu);
    }

    #[test]
    fn test_display_round_trips() {
        let d = Device::Accelerator("cuda:0".into());
        assert_eq!(d.to_string().parse::<Device>().unwrap(), d);
        assert_eq!(Device::Cpu.to_string(), "cpu");
    }

    #[test]
    fn test_serde_as_plain_string() {
        let json = serde_json::to_string(&Device::Accelerator("coreml".into())).unwrap();
        assert_eq!(json, "\"coreml\"");
        let back: Device = serde_json::from_str("\"cpu\"").unwrap();
        assert_eq!(back, Device::Cpu);
    }
}
