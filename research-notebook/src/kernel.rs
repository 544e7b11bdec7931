use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

/// Kernel a generated notebook is tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Kernel {
    #[default]
    #[serde(rename = "python3")]
    Python3,
    /// R via IRkernel.
    #[serde(rename = "ir")]
    R,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelSpec {
    pub name: String,
    pub display_name: String,
    pub language: String,
}

impl Kernel {
    pub fn as_str(self) -> &'static str {
        match self {
            Kernel::Python3 => "python3",
            Kernel::R => "ir",
        }
    }

    pub fn kernelspec(self) -> KernelSpec {
        let (name, display_name, language) = match self {
            Kernel::Python3 => ("python3", "Python 3", "python"),
            Kernel::R => ("ir", "R", "R"),
        };
        KernelSpec {
            name: name.to_string(),
            display_name: display_name.to_string(),
            language: language.to_string(),
        }
    }

    pub fn language_info(self) -> Value {
        match self {
            Kernel::Python3 => json!({
                "name": "python",
                "version": "3.11",
                "file_extension": ".py",
                "mimetype": "text/x-python",
                "codemirror_mode": { "name": "ipython", "version": 3 },
            }),
            Kernel::R => json!({
                "name": "R",
                "file_extension": ".r",
                "mimetype": "text/x-r-source",
            }),
        }
    }
}

impl std::fmt::Display for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Kernel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python3" | "python" => Ok(Kernel::Python3),
            "ir" | "r" => Ok(Kernel::R),
            other => Err(format!("unknown kernel: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_specs() {
        assert_eq!(Kernel::default(), Kernel::Python3);
        assert_eq!(Kernel::R.kernelspec().display_name, "R");
        assert_eq!(Kernel::Python3.language_info()["codemirror_mode"]["version"], 3);
        assert!(Kernel::R.language_info().get("version").is_none());
    }

    #[test]
    fn test_kernel_parse() {
        assert_eq!("IR".parse::<Kernel>(), Ok(Kernel::R));
        assert_eq!("python".parse::<Kernel>(), Ok(Kernel::Python3));
        assert!("julia".parse::<Kernel>().is_err());
        assert_eq!(serde_json::to_string(&Kernel::R).unwrap(), "\"ir\"");
    }
}
