//! Built-in recipes for the search/chat front-end.
//!
//! Dependencies are declared, not implied: a recipe that anchors on markup
//! introduced by another recipe lists it in `requires`.

use crate::templates::{self as t, Template};
use crate::Recipe;
use common::{Guard, Locator, Patch};

const INDEX_HTML: &str = "public/index.html";
const STYLE_CSS: &str = "public/style.css";
const AUTH_MODAL_CSS: &str = "public/auth-modal.css";
const APP_JS: &str = "public/app.js";
const SEARCH_JS: &str = "routes/search.js";

const LANGUAGE_ANCHOR: &str = "      <!-- Language Selector Dropdown -->";
const SCRIPTS_ANCHOR: &str = "  <!-- Scripts -->";
const MODE_SWITCHER: &str = r#"      <button type="button" id="mode-switcher-btn" class="mode-switcher-btn hidden" aria-label="Switch to search mode">"#;

/// Every built-in recipe, in catalog order.
pub fn builtin() -> Vec<Recipe> {
    vec![
        language_selector(),
        language_selector_css(),
        auth_html(),
        auth_layout(),
        auth_layout_css(),
        new_chat(),
        sidebar(),
        sidebar_assets(),
        chat_section_css(),
        search_glue(),
    ]
}

fn recipe(name: &str, artifact: &str, requires: &[&str], patches: Vec<Patch>) -> Recipe {
    Recipe {
        name: name.to_string(),
        artifact: artifact.into(),
        requires: requires.iter().map(|r| r.to_string()).collect(),
        patches,
    }
}

/// Appends a stylesheet template, guarded by its marker.
fn append_css(name: &str, template: &Template) -> Patch {
    Patch::append(name, template.body).guarded(template.guard())
}

fn language_selector() -> Recipe {
    recipe(
        "language-selector",
        INDEX_HTML,
        &[],
        vec![
            Patch::replace(
                "tagline-to-dropdown",
                Locator::literal(r#"<p class="tagline">Search & Discover</p>"#),
                t::LANGUAGE_SELECTOR.body,
            )
            .guarded(t::LANGUAGE_SELECTOR.guard()),
            // Both the main form and the compact header carry a toggle.
            Patch::replace(
                "drop-language-toggles",
                Locator::regex_all(
                    r#"\s*<!-- Language Toggle -->\s*<div class="language-toggle">.*?</div>"#,
                ),
                "",
            )
            .guarded(Guard::lacks("<!-- Language Toggle -->")),
        ],
    )
}

fn language_selector_css() -> Recipe {
    recipe(
        "language-selector-css",
        STYLE_CSS,
        &[],
        vec![append_css("language-selector-css", &t::LANGUAGE_SELECTOR_CSS)],
    )
}

fn auth_html() -> Recipe {
    recipe(
        "auth-html",
        INDEX_HTML,
        &["language-selector"],
        vec![
            Patch::insert_after(
                "link-auth-modal-css",
                Locator::literal(r#"<link rel="stylesheet" href="style.css">"#),
                "\n  <link rel=\"stylesheet\" href=\"auth-modal.css\">",
            )
            .guarded(Guard::contains("auth-modal.css")),
            Patch::replace(
                "sign-in-button",
                Locator::literal(LANGUAGE_ANCHOR),
                format!("{}{}", t::SIGN_IN.body, LANGUAGE_ANCHOR),
            )
            .guarded(t::SIGN_IN.guard()),
            Patch::replace(
                "auth-modal",
                Locator::literal(SCRIPTS_ANCHOR),
                format!("{}{}", t::AUTH_MODAL.body, SCRIPTS_ANCHOR),
            )
            .guarded(t::AUTH_MODAL.guard()),
            Patch::insert_after(
                "auth-script",
                Locator::literal(r#"<script src="app.js"></script>"#),
                "\n  <script src=\"auth.js\"></script>",
            )
            .guarded(Guard::contains(r#"src="auth.js""#)),
        ],
    )
}

fn auth_layout() -> Recipe {
    recipe(
        "auth-layout",
        INDEX_HTML,
        &["auth-html"],
        vec![
            // The logo-section copy is indented six spaces; the top-right
            // copy inserted below uses four and never matches.
            Patch::replace(
                "drop-logo-sign-in",
                Locator::regex(r"      <!-- Sign In Button -->.*?<!-- Language Selector Dropdown -->"),
                LANGUAGE_ANCHOR,
            )
            .guarded(t::TOP_RIGHT_AUTH.guard()),
            Patch::insert_after(
                "top-right-auth",
                Locator::literal(r#"<body class="home-state">"#),
                t::TOP_RIGHT_AUTH.body,
            )
            .guarded(t::TOP_RIGHT_AUTH.guard()),
            Patch::replace(
                "new-chat-button",
                Locator::literal("      </button>\n\n      <div class=\"compact-search-wrapper\""),
                format!(
                    "      </button>\n{}      <div class=\"compact-search-wrapper\"",
                    t::NEW_CHAT_BUTTON.body
                ),
            )
            .guarded(t::NEW_CHAT_BUTTON.guard()),
        ],
    )
}

fn auth_layout_css() -> Recipe {
    recipe(
        "auth-layout-css",
        AUTH_MODAL_CSS,
        &[],
        vec![append_css("top-right-auth-css", &t::TOP_RIGHT_AUTH_CSS)],
    )
}

fn new_chat() -> Recipe {
    recipe(
        "new-chat",
        APP_JS,
        &["auth-layout"],
        vec![
            Patch::insert_after(
                "new-chat-element",
                Locator::literal("  stopBtn: document.getElementById('stop-btn')"),
                ",\n  newChatBtn: document.getElementById('new-chat-btn')",
            )
            .guarded(Guard::contains("newChatBtn:")),
            Patch::insert_after(
                "new-chat-listener",
                Locator::literal("  elements.stopBtn.addEventListener('click', stopAIResponse);"),
                "\n\n  // New Chat button\n  if (elements.newChatBtn) {\n    elements.newChatBtn.addEventListener('click', startNewChat);\n  }",
            )
            .guarded(Guard::contains("elements.newChatBtn.addEventListener")),
            Patch::replace(
                "new-chat-function",
                Locator::literal("// Initialize Application"),
                format!("{}// Initialize Application", t::NEW_CHAT_FN.body),
            )
            .guarded(t::NEW_CHAT_FN.guard()),
        ],
    )
}

fn sidebar() -> Recipe {
    recipe(
        "sidebar",
        INDEX_HTML,
        &["auth-layout"],
        vec![
            Patch::insert_after(
                "sidebar-menu",
                Locator::unique(r#"<section id="chat-section" class="chat-section hidden">"#),
                t::SIDEBAR.body,
            )
            .guarded(t::SIDEBAR.guard()),
            Patch::replace(
                "compact-header-search",
                Locator::regex(format!("{}.*?</button>", regex::escape(MODE_SWITCHER))),
                t::COMPACT_HEADER_SEARCH.body,
            )
            .guarded(t::COMPACT_HEADER_SEARCH.guard()),
        ],
    )
}

fn sidebar_assets() -> Recipe {
    recipe(
        "sidebar-assets",
        INDEX_HTML,
        &["auth-html"],
        vec![
            Patch::insert_after(
                "link-sidebar-css",
                Locator::literal(r#"<link rel="stylesheet" href="auth-modal.css">"#),
                "\n  <link rel=\"stylesheet\" href=\"sidebar.css\">",
            )
            .guarded(Guard::contains("sidebar.css")),
            Patch::insert_after(
                "link-sidebar-js",
                Locator::literal(r#"<script src="auth.js"></script>"#),
                "\n  <script src=\"sidebar.js\"></script>",
            )
            .guarded(Guard::contains("sidebar.js")),
        ],
    )
}

fn chat_section_css() -> Recipe {
    recipe(
        "chat-section-css",
        STYLE_CSS,
        &["language-selector-css"],
        vec![append_css("chat-section-css", &t::CHAT_SECTION_CSS)],
    )
}

fn search_glue() -> Recipe {
    recipe(
        "search-glue",
        SEARCH_JS,
        &[],
        vec![Patch::replace(
            "language-filtered-search",
            Locator::regex(concat!(
                r#"console\.log\(`Search query: "\$\{query\}" \(UI language: \$\{uiLanguage\}\)`\);"#,
                r".*?res\.json\(\{\s*results: results,\s*query: query,\s*count: results\.length\s*\}\);",
            )),
            t::SEARCH_GLUE.body,
        )
        .guarded(t::SEARCH_GLUE.guard())],
    )
}
