//! Named, versioned payloads.
//!
//! Each template's `marker` is a substring that only appears once the
//! payload has been inserted, so [`Template::guard`] makes any patch that
//! carries the template idempotent. Bump `version` whenever `body` changes.

use common::Guard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub name: &'static str,
    pub version: u32,
    pub marker: &'static str,
    pub body: &'static str,
}

impl Template {
    /// Skip guard: holds once the payload is present.
    pub fn guard(&self) -> Guard {
        Guard::contains(self.marker)
    }
}

pub const LANGUAGE_SELECTOR: Template = Template {
    name: "language-selector",
    version: 1,
    marker: r#"id="lang-selector-btn""#,
    body: include_str!("../templates/language-selector.html"),
};

pub const LANGUAGE_SELECTOR_CSS: Template = Template {
    name: "language-selector-css",
    version: 1,
    marker: "LANGUAGE SELECTOR DROPDOWN",
    body: include_str!("../templates/language-selector.css"),
};

pub const SIGN_IN: Template = Template {
    name: "sign-in",
    version: 1,
    marker: r#"id="sign-in-btn""#,
    body: include_str!("../templates/sign-in.html"),
};

pub const AUTH_MODAL: Template = Template {
    name: "auth-modal",
    version: 1,
    marker: r#"id="auth-modal-overlay""#,
    body: include_str!("../templates/auth-modal.html"),
};

pub const TOP_RIGHT_AUTH: Template = Template {
    name: "top-right-auth",
    version: 2,
    marker: r#"class="top-right-auth""#,
    body: include_str!("../templates/top-right-auth.html"),
};

pub const TOP_RIGHT_AUTH_CSS: Template = Template {
    name: "top-right-auth-css",
    version: 1,
    marker: "TOP-RIGHT AUTH SECTION",
    body: include_str!("../templates/top-right-auth.css"),
};

pub const NEW_CHAT_BUTTON: Template = Template {
    name: "new-chat-button",
    version: 1,
    marker: r#"id="new-chat-btn""#,
    body: include_str!("../templates/new-chat-button.html"),
};

pub const NEW_CHAT_FN: Template = Template {
    name: "new-chat-fn",
    version: 1,
    marker: "function startNewChat()",
    body: include_str!("../templates/new-chat.js"),
};

pub const SIDEBAR: Template = Template {
    name: "sidebar",
    version: 3,
    marker: r#"id="sidebar-menu""#,
    body: include_str!("../templates/sidebar.html"),
};

pub const COMPACT_HEADER_SEARCH: Template = Template {
    name: "compact-header-search",
    version: 1,
    marker: r#"id="compact-header-search""#,
    body: include_str!("../templates/compact-header-search.html"),
};

pub const CHAT_SECTION_CSS: Template = Template {
    name: "chat-section-css",
    version: 1,
    marker: "Chat section needs position relative",
    body: include_str!("../templates/chat-section.css"),
};

pub const SEARCH_GLUE: Template = Template {
    name: "search-glue",
    version: 2,
    marker: "Resource language: ${resourceLanguage}",
    body: include_str!("../templates/search-glue.js"),
};

pub const ALL: &[Template] = &[
    LANGUAGE_SELECTOR,
    LANGUAGE_SELECTOR_CSS,
    SIGN_IN,
    AUTH_MODAL,
    TOP_RIGHT_AUTH,
    TOP_RIGHT_AUTH_CSS,
    NEW_CHAT_BUTTON,
    NEW_CHAT_FN,
    SIDEBAR,
    COMPACT_HEADER_SEARCH,
    CHAT_SECTION_CSS,
    SEARCH_GLUE,
];

/// Looks a template up by name.
pub fn get(name: &str) -> Option<&'static Template> {
    ALL.iter().find(|t| t.name == name)
}
