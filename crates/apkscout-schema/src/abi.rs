//! Android ABI and screen-density identifiers.

/// CPU architecture (ABI) of an APK variant or a device.
///
/// Catalogs label variants with the Android ABI name (`arm64-v8a`,
/// `armeabi-v7a`, ...); request-side inputs arrive as free text and are
/// normalized through [`FromStr`](std::str::FromStr), which accepts the
/// common vendor aliases.
///
/// # Example
///
/// ```
/// use apkscout_schema::Abi;
///
/// let abi: Abi = "aarch64".parse().unwrap();
/// assert_eq!(abi, Abi::Arm64V8a);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Abi {
    /// 64-bit ARM (the dominant modern device ABI).
    Arm64V8a,
    /// 32-bit ARM.
    ArmeabiV7a,
    /// 32-bit x86 (emulators, some tablets).
    X86,
    /// 64-bit x86.
    #[serde(rename = "x86_64")]
    X86_64,
    /// Variant with no architecture restriction.
    Universal,
}

impl Abi {
    /// Canonical Android ABI string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arm64V8a => "arm64-v8a",
            Self::ArmeabiV7a => "armeabi-v7a",
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
            Self::Universal => "universal",
        }
    }

    /// The 32-bit ABI this 64-bit ABI can execute, if any.
    ///
    /// A 64-bit device accepts a 32-bit-only variant of the matching
    /// family; the scorer rewards that pairing below an exact match.
    pub fn compat_32bit(&self) -> Option<Self> {
        match self {
            Self::Arm64V8a => Some(Self::ArmeabiV7a),
            Self::X86_64 => Some(Self::X86),
            _ => None,
        }
    }
}

impl std::fmt::Display for Abi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Abi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "arm64-v8a" | "arm64" | "aarch64" => Ok(Self::Arm64V8a),
            "armeabi-v7a" | "armeabi" | "arm" | "armv7" => Ok(Self::ArmeabiV7a),
            "x86" | "i686" => Ok(Self::X86),
            "x86_64" | "x86-64" | "x64" | "amd64" => Ok(Self::X86_64),
            "universal" | "all" | "noarch" | "any" => Ok(Self::Universal),
            _ => Err(format!("Unknown ABI: {s}")),
        }
    }
}

/// Screen density bucket of an APK variant or a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dpi {
    /// Density-agnostic variant.
    NoDpi,
    /// ~160dpi.
    Mdpi,
    /// ~240dpi.
    Hdpi,
    /// ~320dpi.
    Xhdpi,
    /// ~480dpi.
    Xxhdpi,
    /// ~640dpi.
    Xxxhdpi,
}

impl Dpi {
    /// Canonical density bucket name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoDpi => "nodpi",
            Self::Mdpi => "mdpi",
            Self::Hdpi => "hdpi",
            Self::Xhdpi => "xhdpi",
            Self::Xxhdpi => "xxhdpi",
            Self::Xxxhdpi => "xxxhdpi",
        }
    }
}

impl std::fmt::Display for Dpi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Dpi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nodpi" => Ok(Self::NoDpi),
            "mdpi" => Ok(Self::Mdpi),
            "hdpi" => Ok(Self::Hdpi),
            "xhdpi" => Ok(Self::Xhdpi),
            "xxhdpi" => Ok(Self::Xxhdpi),
            "xxxhdpi" => Ok(Self::Xxxhdpi),
            _ => Err(format!("Unknown density: {s}")),
        }
    }
}
