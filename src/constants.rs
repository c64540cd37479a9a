//! Wire tokens, header names and environment variable names.

/// Substituted for an embedded variable that resolves to nothing.
pub const NULL_TOKEN: &str = "<null>";

/// Substituted for an embedded variable of a binary type.
pub const BINARY_TOKEN: &str = "<binary>";

/// Header carrying the session context on API backend requests.
pub const DB_CONTEXT_HEADER: &str = "DB-Context";

/// Content type of API backend request bodies.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Default API namespace: `/internal/playbooks/keyValue/...`.
pub const DEFAULT_API_NAMESPACE: &str = "playbooks";

/// Default upper bound on text scanned for embedded variables.
pub const DEFAULT_MAX_EMBEDDED_SCAN_BYTES: usize = 65_536;

/// Environment variable holding the session context.
pub const ENV_CONTEXT: &str = "TC_PLAYBOOK_KVSTORE_CONTEXT";

/// Environment variable holding the comma-separated output variables.
pub const ENV_OUT_VARIABLES: &str = "TC_PLAYBOOK_OUT_VARIABLES";

/// Environment variable holding the Redis host.
pub const ENV_KVSTORE_HOST: &str = "TC_KVSTORE_HOST";

/// Environment variable holding the Redis port.
pub const ENV_KVSTORE_PORT: &str = "TC_KVSTORE_PORT";

/// Environment variable holding the platform API base URL.
pub const ENV_API_PATH: &str = "TC_API_PATH";

/// Environment variable holding the API `Authorization` header value.
pub const ENV_TOKEN: &str = "TC_TOKEN";
