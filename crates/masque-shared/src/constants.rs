/// Application name
pub const APP_NAME: &str = "Masque";

/// Random bytes per pseudonym fragment (two fragments => 96 bits)
pub const PSEUDONYM_FRAGMENT_BYTES: usize = 6;

/// Longest pseudonym accepted from user input
pub const PSEUDONYM_MAX_LEN: usize = 64;

/// Reserved pseudonym routed to the configured support account
pub const SUPPORT_PSEUDONYM: &str = "support";

/// Literal marker appended by the mark toggle
pub const MARK_SUFFIX: &str = "\n#\u{fe0f}\u{20e3} #mark";

/// Maximum number of entries in one account's block list
pub const MAX_BLOCK_LIST: usize = 500;

/// Default state/compat version stamped on new accounts
pub const DEFAULT_STATE_VERSION: u32 = 1;

/// Default HTTP port (webhook + admin API)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Deep-link prefix for share links
pub const DEEP_LINK_BASE: &str = "https://t.me";
