//! Thin wrappers over the `log` facade so call sites can pass any `Display`.

pub fn debug(s: impl std::fmt::Display) {
    log::debug!(target: "ragdesk", "{}", s);
}

pub fn info(s: impl std::fmt::Display) {
    log::info!(target: "ragdesk", "{}", s);
}

pub fn warn(s: impl std::fmt::Display) {
    log::warn!(target: "ragdesk", "{}", s);
}

pub fn error(s: impl std::fmt::Display) {
    log::error!(target: "ragdesk", "{}", s);
}
