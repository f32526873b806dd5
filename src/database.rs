//! Database attachment handle and its connection parameters.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::protocol::buffer::ReadBuffer;
use crate::protocol::charset::{CharsetContext, CharsetRegistry};
use crate::protocol::constants::*;
use crate::protocol::message::Message;
use crate::protocol::messages::{AttachMessage, HandleMessage};
use crate::protocol::param_buffer::{DatabaseParameterBuffer, ServiceParameterBuffer};
use crate::protocol::response::{parse_response, GenericResponse};
use crate::protocol::transport::{round_trip, Transport};

/// Default connection charset.
pub const DEFAULT_CHARSET: &str = "UTF8";
/// Default SQL dialect.
pub const DEFAULT_DIALECT: i32 = 3;
/// Default packet size.
pub const DEFAULT_PACKET_SIZE: u32 = 8192;
/// Default number of rows requested per op_fetch.
pub const DEFAULT_FETCH_SIZE: u32 = 200;

/// Attachment parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseParams {
    /// Database path or alias on the server.
    pub database: String,
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
    /// SQL role.
    pub role: Option<String>,
    /// Connection charset name.
    pub charset: String,
    /// SQL dialect.
    pub dialect: i32,
    /// Packet size, also used as blob segment size when the transport does
    /// not report one.
    pub packet_size: u32,
    /// Rows requested per fetch.
    pub fetch_size: u32,
    /// Page cache size override.
    pub page_buffers: Option<i32>,
}

impl DatabaseParams {
    /// Create parameters with defaults for everything but the credentials.
    pub fn new(
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            user: user.into(),
            password: password.into(),
            role: None,
            charset: DEFAULT_CHARSET.to_string(),
            dialect: DEFAULT_DIALECT,
            packet_size: DEFAULT_PACKET_SIZE,
            fetch_size: DEFAULT_FETCH_SIZE,
            page_buffers: None,
        }
    }

    /// Set the SQL role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the connection charset.
    ///
    /// # Example
    ///
    /// ```
    /// use firebird_thin_rs::DatabaseParams;
    ///
    /// let params = DatabaseParams::new("employee", "SYSDBA", "masterkey")
    ///     .with_charset("WIN1252");
    /// assert_eq!(params.charset, "WIN1252");
    /// ```
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Set the SQL dialect.
    pub fn with_dialect(mut self, dialect: i32) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the fetch size.
    pub fn with_fetch_size(mut self, fetch_size: u32) -> Self {
        self.fetch_size = fetch_size;
        self
    }

    /// Set the packet size.
    pub fn with_packet_size(mut self, packet_size: u32) -> Self {
        self.packet_size = packet_size;
        self
    }

    /// Set the page buffer count.
    pub fn with_page_buffers(mut self, page_buffers: i32) -> Self {
        self.page_buffers = Some(page_buffers);
        self
    }

    /// Parse a connection string like
    /// `"database=employee;user=SYSDBA;password=masterkey;charset=UTF8"`.
    ///
    /// Keys are case-insensitive; spaces and underscores in keys are
    /// ignored, so `packet size` and `PACKET_SIZE` are the same key.
    pub fn parse(conn_str: &str) -> Result<Self> {
        let mut params = Self::new("", "", "");
        let mut have_database = false;

        for part in conn_str.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part.split_once('=').ok_or_else(|| Error::InvalidConnectString {
                message: format!("Expected key=value, got '{}'", part),
            })?;
            let key: String = key
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '_')
                .collect::<String>()
                .to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "database" => {
                    params.database = value.to_string();
                    have_database = !value.is_empty();
                }
                "user" => params.user = value.to_string(),
                "password" => params.password = value.to_string(),
                "role" => params.role = Some(value.to_string()),
                "charset" => params.charset = value.to_string(),
                "dialect" => params.dialect = parse_number(&key, value)?,
                "packetsize" => params.packet_size = parse_number(&key, value)?,
                "fetchsize" => params.fetch_size = parse_number(&key, value)?,
                "pagebuffers" => params.page_buffers = Some(parse_number(&key, value)?),
                _ => {
                    return Err(Error::InvalidConnectString {
                        message: format!("Unknown key: {}", key),
                    })
                }
            }
        }

        if !have_database {
            return Err(Error::InvalidConnectString {
                message: "Missing database".to_string(),
            });
        }
        if !matches!(params.dialect, 1 | 3) {
            return Err(Error::InvalidConnectString {
                message: format!("Unsupported dialect: {}", params.dialect),
            });
        }
        Ok(params)
    }

    /// Build the DPB sent with op_attach.
    pub fn to_dpb(&self) -> DatabaseParameterBuffer {
        let mut dpb = DatabaseParameterBuffer::new();
        dpb.append_i32(ISC_DPB_DUMMY_PACKET_INTERVAL, 120)
            .append_i32(ISC_DPB_SQL_DIALECT, self.dialect)
            .append_str(ISC_DPB_LC_CTYPE, &self.charset)
            .append_str(ISC_DPB_USER_NAME, &self.user)
            .append_str(ISC_DPB_PASSWORD, &self.password);
        if let Some(role) = &self.role {
            dpb.append_str(ISC_DPB_SQL_ROLE_NAME, role);
        }
        if let Some(page_buffers) = self.page_buffers {
            dpb.append_i32(ISC_DPB_PAGE_BUFFERS, page_buffers);
        }
        dpb
    }

    /// Build the SPB credentials for a service manager attachment.
    pub fn to_spb(&self) -> ServiceParameterBuffer {
        let mut spb = ServiceParameterBuffer::new();
        spb.append_str(ISC_SPB_USER_NAME, &self.user)
            .append_str(ISC_SPB_PASSWORD, &self.password);
        spb
    }
}

fn parse_number<N: std::str::FromStr>(key: &str, value: &str) -> Result<N> {
    value.parse().map_err(|_| Error::InvalidConnectString {
        message: format!("Invalid value for {}: {}", key, value),
    })
}

/// An attachment to a Firebird database.
///
/// Every operation borrows the attachment mutably, which keeps one request
/// outstanding on the transport at a time.
pub struct Database<T: Transport> {
    transport: T,
    handle: i32,
    attached: bool,
    charsets: CharsetContext,
    params: DatabaseParams,
}

impl<T: Transport> Database<T> {
    /// Attach with a fresh charset registry.
    pub async fn attach(transport: T, params: DatabaseParams) -> Result<Self> {
        Self::attach_with_registry(transport, params, Arc::new(CharsetRegistry::new())).await
    }

    /// Attach sharing an existing charset registry.
    pub async fn attach_with_registry(
        transport: T,
        params: DatabaseParams,
        registry: Arc<CharsetRegistry>,
    ) -> Result<Self> {
        let charsets = CharsetContext::new(registry, &params.charset)?;
        let mut db = Self {
            transport,
            handle: 0,
            attached: false,
            charsets,
            params,
        };

        let dpb = db.params.to_dpb();
        let database = db.charsets.default_charset().encode(&db.params.database)?;
        let response = db
            .execute(&AttachMessage {
                database: &database,
                dpb: dpb.as_bytes(),
            })
            .await?;
        db.handle = response.handle;
        db.attached = true;
        tracing::debug!(
            database = %db.params.database,
            handle = db.handle,
            charset = %db.params.charset,
            "attached"
        );
        Ok(db)
    }

    /// Send op_detach. Detaching twice is a no-op.
    pub async fn detach(&mut self) -> Result<()> {
        if !self.attached {
            return Ok(());
        }
        self.execute(&HandleMessage::new(OP_DETACH, self.handle))
            .await?;
        self.attached = false;
        tracing::debug!(handle = self.handle, "detached");
        Ok(())
    }

    /// Server-side attachment handle.
    pub fn handle(&self) -> i32 {
        self.handle
    }

    /// Whether the attachment is live.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Attachment parameters.
    pub fn params(&self) -> &DatabaseParams {
        &self.params
    }

    /// Charset registry and connection charset.
    pub fn charsets(&self) -> &CharsetContext {
        &self.charsets
    }

    /// SQL dialect.
    pub fn dialect(&self) -> i32 {
        self.params.dialect
    }

    /// Blob segment size: the transport's packet size, or the configured one.
    pub fn segment_size(&self) -> usize {
        let size = match self.transport.packet_size() {
            0 => self.params.packet_size,
            negotiated => negotiated,
        };
        size.clamp(1, MAX_SEGMENT_REQUEST) as usize
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Send a message and return the raw reply.
    pub(crate) async fn request<M: Message + Sync>(&mut self, message: &M) -> Result<ReadBuffer> {
        round_trip(&mut self.transport, message).await
    }

    /// Send a message answered by a single op_response.
    pub(crate) async fn execute<M: Message + Sync>(
        &mut self,
        message: &M,
    ) -> Result<GenericResponse> {
        let mut buf = self.request(message).await?;
        parse_response(&mut buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_defaults() {
        let params = DatabaseParams::new("employee", "SYSDBA", "masterkey");
        assert_eq!(params.charset, "UTF8");
        assert_eq!(params.dialect, 3);
        assert_eq!(params.packet_size, 8192);
        assert_eq!(params.fetch_size, 200);
        assert!(params.role.is_none());
        assert!(params.page_buffers.is_none());
    }

    #[test]
    fn test_parse_connect_string() {
        let params = DatabaseParams::parse(
            "Database=/data/emp.fdb; User=SYSDBA; Password=masterkey; Packet Size=4096; FETCH_SIZE=50; role=R1;",
        )
        .unwrap();
        assert_eq!(params.database, "/data/emp.fdb");
        assert_eq!(params.user, "SYSDBA");
        assert_eq!(params.packet_size, 4096);
        assert_eq!(params.fetch_size, 50);
        assert_eq!(params.role.as_deref(), Some("R1"));
        assert_eq!(params.charset, "UTF8");
    }

    #[test]
    fn test_parse_invalid() {
        for input in [
            "user=SYSDBA",
            "database=x;bogus",
            "database=x;dialect=two",
            "database=x;dialect=2",
            "database=x;color=blue",
        ] {
            assert!(
                matches!(
                    DatabaseParams::parse(input),
                    Err(Error::InvalidConnectString { .. })
                ),
                "expected failure for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_spb_credentials() {
        let params = DatabaseParams::new("employee", "SYSDBA", "pw");
        let spb = params.to_spb();
        let mut expected = vec![ISC_SPB_VERSION2, ISC_SPB_CURRENT_VERSION, ISC_SPB_USER_NAME, 6, 0];
        expected.extend_from_slice(b"SYSDBA");
        expected.extend_from_slice(&[ISC_SPB_PASSWORD, 2, 0, b'p', b'w']);
        assert_eq!(spb.as_bytes(), expected.as_slice());
    }

    #[test]
    fn test_dpb_layout() {
        let params = DatabaseParams::new("db", "U", "P").with_role("R");
        let dpb = params.to_dpb();
        let bytes = dpb.as_bytes();
        assert_eq!(bytes[0], ISC_DPB_VERSION1);
        assert_eq!(&bytes[1..7], &[ISC_DPB_DUMMY_PACKET_INTERVAL, 4, 0, 0, 0, 120]);
        assert_eq!(&bytes[7..13], &[ISC_DPB_SQL_DIALECT, 4, 0, 0, 0, 3]);
        assert_eq!(&bytes[13..19], &[ISC_DPB_LC_CTYPE, 4, b'U', b'T', b'F', b'8']);
        assert_eq!(&bytes[bytes.len() - 3..], &[ISC_DPB_SQL_ROLE_NAME, 1, b'R']);
        assert_eq!(dpb.len(), dpb.to_bytes().len());
    }
}
