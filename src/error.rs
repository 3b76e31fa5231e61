use std::fmt;

#[derive(Debug)]
pub enum PrintError {
    MissingContent,
    NoSections,
    SectionNotFound,
    EmptyTable,
    MissingTableBody,
    Io(std::io::Error),
}

impl PrintError {
    /// Structural no-ops: the input is left untouched and the run carries on.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            PrintError::EmptyTable | PrintError::MissingTableBody | PrintError::SectionNotFound
        )
    }
}

impl fmt::Display for PrintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrintError::MissingContent => write!(f, "document has no print content container"),
            PrintError::NoSections => write!(f, "print content has no sections"),
            PrintError::SectionNotFound => {
                write!(f, "splittable table is not inside a print section")
            }
            PrintError::EmptyTable => write!(f, "table has no body rows"),
            PrintError::MissingTableBody => write!(f, "table has no tbody"),
            PrintError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for PrintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PrintError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PrintError {
    fn from(value: std::io::Error) -> Self {
        PrintError::Io(value)
    }
}
