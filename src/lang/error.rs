/// Phase of the pipeline an error was raised in.
///
/// Scan and compile errors abort compilation. Optimize errors are raised
/// while folding literal blocks and are surfaced to the caller as a
/// compile failure. Runtime errors abort the current tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorCode {
    Scan,
    Compile,
    Optimize,
    Runtime,
}

pub struct Error {
    code: ErrorCode,
    message: String,
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($code:ident; $($arg:tt)*) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$code, format!($($arg)*))
    };
}

impl Error {
    pub fn new(code: ErrorCode, message: String) -> Error {
        Error { code, message }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::error::Error for Error {}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error {{ {} }}", self.to_string())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let phase = match self.code {
            ErrorCode::Scan => "Scan",
            ErrorCode::Compile => "Compile",
            ErrorCode::Optimize => "Optimize",
            ErrorCode::Runtime => "Runtime",
        };
        write!(f, "{} error: {}", phase, self.message)
    }
}
