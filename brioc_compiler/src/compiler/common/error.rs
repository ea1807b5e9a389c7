//! The errors emitted throughout all of brioc

/// All error-kinds produced by the compiler phases. The diagnostic strings
/// returned by [message](ErrorKind::message) are fixed and test-observable.
#[derive(Debug, PartialEq, Clone)]
pub enum ErrorKind {
    // scan errors
    UnexpectedChar(char),
    UnterminatedString,
    InvalidEscape(char),
    NumberTooLarge(String),

    // parse errors
    Expected(&'static str, String),
    Eof(&'static str),

    // name-analysis errors
    NoMain,
    NonFunctionVoid,
    InvalidStructType,
    MultiplyDeclared,
    UndeclaredIdent,
    DotAccessNonStruct,
    InvalidStructField,

    // type errors
    NonNumericArith,
    NonNumericRelational,
    NonBoolLogical,
    NonBoolIf,
    NonBoolWhile,
    NonIntRepeat,
    TypeMismatch,
    EqualityVoidFns,
    EqualityFns,
    EqualityStructNames,
    EqualityStructVars,
    FnAssign,
    StructNameAssign,
    StructVarAssign,
    CallNonFn,
    WrongArgCount,
    ArgTypeMismatch,
    MissingReturn,
    ReturnValueInVoid,
    BadReturnValue,
    WriteFn,
    WriteStructName,
    WriteStructVar,
    WriteVoid,
    ReadFn,
    ReadStructName,
    ReadStructVar,

    Regular(&'static str), // generic error message only used once
}

impl ErrorKind {
    /// The diagnostic string emitted for this error
    pub fn message(&self) -> String {
        match self {
            ErrorKind::UnexpectedChar(c) => format!("unexpected character: {:?}", c),
            ErrorKind::UnterminatedString => "unterminated string literal".to_string(),
            ErrorKind::InvalidEscape(c) => format!("cannot escape character '{}'", c),
            ErrorKind::NumberTooLarge(s) => {
                format!("integer literal '{}' too large to fit in 32bits", s)
            }

            ErrorKind::Expected(expected, found) => {
                format!("expected {}, found {}", expected, found)
            }
            ErrorKind::Eof(expected) => format!("expected {}, found end of file", expected),

            ErrorKind::NoMain => "No main function".to_string(),
            ErrorKind::NonFunctionVoid => "Non-function declared void".to_string(),
            ErrorKind::InvalidStructType => "Invalid name of struct type".to_string(),
            ErrorKind::MultiplyDeclared => "Multiply declared identifier".to_string(),
            ErrorKind::UndeclaredIdent => "Undeclared identifier".to_string(),
            ErrorKind::DotAccessNonStruct => "Dot-access of non-struct type".to_string(),
            ErrorKind::InvalidStructField => "Invalid struct field name".to_string(),

            ErrorKind::NonNumericArith => {
                "Arithmetic operator applied to non-numeric operand".to_string()
            }
            ErrorKind::NonNumericRelational => {
                "Relational operator applied to non-numeric operand".to_string()
            }
            ErrorKind::NonBoolLogical => {
                "Logical operator applied to non-bool operand".to_string()
            }
            ErrorKind::NonBoolIf => "Non-bool expression used as an if condition".to_string(),
            ErrorKind::NonBoolWhile => {
                "Non-bool expression used as a while condition".to_string()
            }
            ErrorKind::NonIntRepeat => {
                "Non-integer expression used as a repeat clause".to_string()
            }
            ErrorKind::TypeMismatch => "Type mismatch".to_string(),
            ErrorKind::EqualityVoidFns => {
                "Equality operator applied to void functions".to_string()
            }
            ErrorKind::EqualityFns => "Equality operator applied to functions".to_string(),
            ErrorKind::EqualityStructNames => {
                "Equality operator applied to struct names".to_string()
            }
            ErrorKind::EqualityStructVars => {
                "Equality operator applied to struct variables".to_string()
            }
            ErrorKind::FnAssign => "Function assignment".to_string(),
            ErrorKind::StructNameAssign => "Struct name assignment".to_string(),
            ErrorKind::StructVarAssign => "Struct variable assignment".to_string(),
            ErrorKind::CallNonFn => "Attempt to call a non-function".to_string(),
            ErrorKind::WrongArgCount => "Function call with wrong number of args".to_string(),
            ErrorKind::ArgTypeMismatch => {
                "Type of actual does not match type of formal".to_string()
            }
            ErrorKind::MissingReturn => "Missing return value".to_string(),
            ErrorKind::ReturnValueInVoid => {
                "Return with a value in a void function".to_string()
            }
            ErrorKind::BadReturnValue => "Bad return value".to_string(),
            ErrorKind::WriteFn => "Attempt to write a function".to_string(),
            ErrorKind::WriteStructName => "Attempt to write a struct name".to_string(),
            ErrorKind::WriteStructVar => "Attempt to write a struct variable".to_string(),
            ErrorKind::WriteVoid => "Attempt to write void".to_string(),
            ErrorKind::ReadFn => "Attempt to read a function".to_string(),
            ErrorKind::ReadStructName => "Attempt to read a struct name".to_string(),
            ErrorKind::ReadStructVar => "Attempt to read a struct variable".to_string(),

            ErrorKind::Regular(s) => s.to_string(),
        }
    }
}

/// Main error used throughout [brioc_compiler](crate). Position `(0, 0)`
/// marks program-level diagnostics with no single source location.
#[derive(Debug, PartialEq, Clone)]
pub struct Error {
    pub line: i32,
    pub column: i32,
    pub kind: ErrorKind,
}

impl Error {
    pub fn new(object: &impl Location, kind: ErrorKind) -> Self {
        Error {
            line: object.line(),
            column: object.column(),
            kind,
        }
    }

    /// Diagnostic anchored to the whole program rather than a token
    pub fn program_level(kind: ErrorKind) -> Self {
        Error { line: 0, column: 0, kind }
    }

    pub fn eof(expected: &'static str) -> Self {
        Error {
            line: -1,
            column: -1,
            kind: ErrorKind::Eof(expected),
        }
    }

    /// Prints the error to `stderr` with its location information.
    pub fn print_error(&self, filename: &str) {
        eprintln!("error: {}", self.kind.message());
        if self.line > 0 {
            eprintln!("  --> {}:{}:{}", filename, self.line, self.column);
        }
    }
}

/// Trait implemented by everything an error can be anchored to: tokens and
/// the AST nodes that carry positions.
pub trait Location {
    fn line(&self) -> i32;
    fn column(&self) -> i32;
}
