//! Server status vectors and error message rendering.
//!
//! A status vector is a flat list of typed cells. A GDS or warning code
//! starts a message unit; the argument cells that follow it fill the
//! `@1..@n` placeholders of that code's message template.

use std::fmt;

use crate::error::Result;
use crate::protocol::buffer::ReadBuffer;
use crate::protocol::constants::*;

/// One typed cell of a status vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCell {
    /// Error code starting a message unit.
    Gds(i32),
    /// Warning code starting a message unit.
    Warning(i32),
    /// String argument.
    String(String),
    /// C string argument.
    CString(String),
    /// Numeric argument.
    Number(i32),
    /// Preformatted message text.
    Interpreted(String),
    /// SQLSTATE code.
    SqlState(String),
    /// Operating-system specific code (unix errno, win32, ...).
    Other { arg_type: i32, value: i32 },
}

impl ErrorCell {
    fn argument_text(&self) -> Option<String> {
        match self {
            ErrorCell::String(s) | ErrorCell::CString(s) | ErrorCell::Interpreted(s) => {
                Some(s.clone())
            }
            ErrorCell::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Error or warning reported by the server.
///
/// The cells are kept for inspection; the message is rendered on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IscError {
    cells: Vec<ErrorCell>,
}

impl IscError {
    /// Build an error from cells.
    pub fn new(cells: Vec<ErrorCell>) -> Self {
        Self { cells }
    }

    /// Build an error with a single GDS code.
    pub fn from_code(code: i32) -> Self {
        Self::new(vec![ErrorCell::Gds(code)])
    }

    /// Append an argument cell.
    pub fn with_arg(mut self, cell: ErrorCell) -> Self {
        self.cells.push(cell);
        self
    }

    /// All cells in vector order.
    pub fn cells(&self) -> &[ErrorCell] {
        &self.cells
    }

    /// Leading error code, or the user exception number for isc_except.
    pub fn error_code(&self) -> i32 {
        let mut first = None;
        for (i, cell) in self.cells.iter().enumerate() {
            let code = match cell {
                ErrorCell::Gds(code) | ErrorCell::Warning(code) => *code,
                _ => continue,
            };
            if code == ISC_EXCEPT {
                if let Some(number) = self.exception_number(i) {
                    return number;
                }
            }
            first.get_or_insert(code);
        }
        first.unwrap_or(0)
    }

    fn exception_number(&self, index: usize) -> Option<i32> {
        match self.cells.get(index + 1)? {
            ErrorCell::Number(n) => Some(*n),
            ErrorCell::String(s) | ErrorCell::CString(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Whether the vector carries only warnings.
    pub fn is_warning(&self) -> bool {
        let mut has_warning = false;
        for cell in &self.cells {
            match cell {
                ErrorCell::Gds(_) => return false,
                ErrorCell::Warning(_) => has_warning = true,
                _ => {}
            }
        }
        has_warning
    }

    /// SQLSTATE, when the server sent one.
    pub fn sql_state(&self) -> Option<&str> {
        self.cells.iter().find_map(|cell| match cell {
            ErrorCell::SqlState(state) => Some(state.as_str()),
            _ => None,
        })
    }

    /// Render the full message, one line per unit.
    pub fn message(&self) -> String {
        let mut units: Vec<String> = Vec::new();
        let mut i = 0;
        while i < self.cells.len() {
            match &self.cells[i] {
                ErrorCell::Gds(code) | ErrorCell::Warning(code) => {
                    let mut args = Vec::new();
                    let mut j = i + 1;
                    while let Some(arg) = self.cells.get(j).and_then(ErrorCell::argument_text) {
                        args.push(arg);
                        j += 1;
                    }
                    // isc_except only carries the user exception number
                    if *code != ISC_EXCEPT {
                        units.push(render_message(*code, &args));
                    }
                    i = j;
                }
                ErrorCell::Interpreted(text) => {
                    units.push(text.clone());
                    i += 1;
                }
                _ => i += 1,
            }
        }
        units.join("\n")
    }
}

impl fmt::Display for IscError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for IscError {}

/// Parse a status vector up to `isc_arg_end`.
///
/// Returns `None` for a success vector (no cells or only code 0).
pub fn parse_status_vector(buf: &mut ReadBuffer) -> Result<Option<IscError>> {
    let mut cells = Vec::new();
    loop {
        let arg_type = buf.read_i32()?;
        let cell = match arg_type {
            ISC_ARG_END => break,
            ISC_ARG_GDS => {
                let code = buf.read_i32()?;
                if code == 0 {
                    continue;
                }
                ErrorCell::Gds(code)
            }
            ISC_ARG_WARNING => {
                let code = buf.read_i32()?;
                if code == 0 {
                    continue;
                }
                ErrorCell::Warning(code)
            }
            ISC_ARG_STRING => ErrorCell::String(buf.read_string()?),
            ISC_ARG_CSTRING => ErrorCell::CString(buf.read_string()?),
            ISC_ARG_INTERPRETED => ErrorCell::Interpreted(buf.read_string()?),
            ISC_ARG_SQL_STATE => ErrorCell::SqlState(buf.read_string()?),
            ISC_ARG_NUMBER => ErrorCell::Number(buf.read_i32()?),
            other => ErrorCell::Other {
                arg_type: other,
                value: buf.read_i32()?,
            },
        };
        cells.push(cell);
    }

    if cells.is_empty() {
        Ok(None)
    } else {
        Ok(Some(IscError::new(cells)))
    }
}

/// Substitute `@1..@n` in the template for `code`.
///
/// The template is scanned once, so argument text is never re-expanded.
/// Arguments no placeholder refers to are appended after a colon. Codes
/// without a template render a generic placeholder line.
pub fn render_message(code: i32, args: &[String]) -> String {
    let Some(template) = message_template(code) else {
        return format!("No message for error code {} found.", code);
    };
    let mut message = String::with_capacity(template.len());
    let mut used = vec![false; args.len()];
    let mut rest = template;
    while let Some(at) = rest.find('@') {
        message.push_str(&rest[..at]);
        let after = &rest[at + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        let slot = after[..digits]
            .parse::<usize>()
            .ok()
            .filter(|&n| n >= 1 && n <= args.len());
        match slot {
            Some(n) => {
                message.push_str(&args[n - 1]);
                used[n - 1] = true;
            }
            None => {
                message.push('@');
                message.push_str(&after[..digits]);
            }
        }
        rest = &after[digits..];
    }
    message.push_str(rest);

    let extra: Vec<&str> = args
        .iter()
        .zip(&used)
        .filter(|&(_, used)| !*used)
        .map(|(arg, _)| arg.as_str())
        .collect();
    if !extra.is_empty() {
        message.push_str(": ");
        message.push_str(&extra.join(", "));
    }
    message
}

/// Message template for a GDS code.
pub fn message_template(code: i32) -> Option<&'static str> {
    MESSAGES
        .binary_search_by_key(&code, |&(c, _)| c)
        .ok()
        .map(|i| MESSAGES[i].1)
}

/// Known GDS message templates, sorted by code.
static MESSAGES: &[(i32, &str)] = &[
    (335544321, "arithmetic exception, numeric overflow, or string truncation"),
    (335544322, "invalid database key"),
    (335544323, "file @1 is not a valid database"),
    (335544324, "invalid database handle (no active connection)"),
    (335544325, "bad parameters on attach or create database"),
    (335544326, "unrecognized database parameter block"),
    (335544327, "invalid request handle"),
    (335544328, "invalid BLOB handle"),
    (335544329, "invalid BLOB ID"),
    (335544330, "invalid parameter in transaction parameter block"),
    (335544331, "invalid format for transaction parameter block"),
    (335544332, "invalid transaction handle (expecting explicit transaction start)"),
    (335544334, "conversion error from string \"@1\""),
    (335544335, "database file appears corrupt (@1)"),
    (335544336, "deadlock"),
    (335544338, "no match for first value expression"),
    (335544339, "information type inappropriate for object specified"),
    (335544340, "no information of this type available for object specified"),
    (335544341, "unknown information item"),
    (335544342, "action cancelled by trigger (@1) to preserve data integrity"),
    (335544343, "invalid request BLR at offset @1"),
    (335544344, "I/O error during \"@1\" operation for file \"@2\""),
    (335544345, "lock conflict on no wait transaction"),
    (335544347, "validation error for column @1, value \"@2\""),
    (335544348, "no current record for fetch operation"),
    (335544349, "attempt to store duplicate value (visible to active transactions) in unique index \"@1\""),
    (335544350, "program attempted to exit without finishing database"),
    (335544351, "unsuccessful metadata update"),
    (335544352, "no permission for @1 access to @2 @3"),
    (335544353, "transaction is not in limbo"),
    (335544354, "invalid database key"),
    (335544355, "BLOB was not closed"),
    (335544357, "cannot disconnect database with open transactions (@1 active)"),
    (335544358, "message length error (encountered @1, expected @2)"),
    (335544359, "attempted update of read-only column @1"),
    (335544360, "attempted update of read-only table"),
    (335544361, "attempted update during read-only transaction"),
    (335544362, "cannot update read-only view @1"),
    (335544363, "no transaction for request"),
    (335544364, "request synchronization error"),
    (335544365, "request referenced an unavailable database"),
    (335544366, "segment buffer length shorter than expected"),
    (335544367, "attempted retrieval of more segments than exist"),
    (335544368, "attempted invalid operation on a BLOB"),
    (335544369, "attempted read of a new, open BLOB"),
    (335544370, "attempted action on BLOB outside transaction"),
    (335544371, "attempted write to read-only BLOB"),
    (335544372, "attempted reference to BLOB in unavailable database"),
    (335544373, "operating system directive @1 failed"),
    (335544374, "attempt to fetch past the last record in a record stream"),
    (335544375, "unavailable database"),
    (335544376, "table @1 was omitted from the transaction reserving list"),
    (335544377, "request includes a DSRI extension not supported in this implementation"),
    (335544378, "feature is not supported"),
    (335544379, "unsupported on-disk structure for file @1; found @2.@3, support @4.@5"),
    (335544380, "wrong number of arguments on call"),
    (335544381, "Implementation limit exceeded"),
    (335544382, "@1"),
    (335544383, "unrecoverable conflict with limbo transaction @1"),
    (335544384, "internal error"),
    (335544436, "SQL error code = @1"),
    (335544458, "column not array or invalid dimensions (expected @1, encountered @2)"),
    (335544466, "violation of FOREIGN KEY constraint \"@1\" on table \"@2\""),
    (335544472, "Your user name and password are not defined. Ask your database administrator to set up a Firebird login."),
    (335544517, "exception @1"),
    (335544558, "Operation violates CHECK constraint @1 on view or table @2"),
    (335544569, "Dynamic SQL Error"),
    (335544578, "Column unknown"),
    (335544580, "Table unknown"),
    (335544634, "Token unknown - line @1, column @2"),
    (335544665, "violation of PRIMARY or UNIQUE KEY constraint \"@1\" on table \"@2\""),
    (335544721, "Unable to complete network request to host \"@1\""),
    (335544878, "concurrent transaction number is @1"),
];
