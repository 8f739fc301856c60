use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

// both codes are plain GUIDs, the newtypes just keep them from being mixed up.
// Display gives registry format (braces, upper case), which is what msi.dll wants.
macro_rules! guid_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Uuid);

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:X}", self.0.braced())
            }
        }
    };
}

guid_type!(
    /// Identifier shared by every version of a product family.
    UpgradeCode
);

guid_type!(
    /// Identifier of one installed product.
    ProductCode
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hyphenated_and_braced() {
        let a: UpgradeCode = "6b124a3c-f3f9-480d-82f9-881e0b5663a1".parse().unwrap();
        let b: UpgradeCode = "{6B124A3C-F3F9-480D-82F9-881E0B5663A1}".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn displays_in_registry_format() {
        let code: ProductCode = "6b124a3c-f3f9-480d-82f9-881e0b5663a1".parse().unwrap();
        assert_eq!(code.to_string(), "{6B124A3C-F3F9-480D-82F9-881E0B5663A1}");
        // 38 chars, plus the nul makes the 39 the enumeration buffer holds
        assert_eq!(code.to_string().len(), 38);
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-a-guid".parse::<UpgradeCode>().is_err());
        assert!("".parse::<ProductCode>().is_err());
    }
}
