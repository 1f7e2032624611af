//! Word and class-path tables shared by both ends of an exchange.
//!
//! Each table is a fixed base list plus an append-only extension area.
//! Indices are `u16` and stay below [`ESCAPE_LIMIT`], so the first byte of an
//! encoded index is never the `0xFF` literal escape.

use std::collections::HashMap;

/// Exclusive upper bound for table indices.
pub const ESCAPE_LIMIT: u16 = 0xFF00;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DictionaryError {
    #[error("{table} table is full ({limit} entries)")]
    Full { table: &'static str, limit: u16 },
    #[error("cannot register an empty {table} entry")]
    Empty { table: &'static str },
}

const BASE_WORDS: &[&str] = &[
    // articles, pronouns, connectives
    "a", "an", "the", "and", "or", "but", "not", "no", "yes", "of", "to", "in", "on", "at", "for",
    "with", "by", "from", "as", "is", "are", "was", "be", "it", "this", "that", "these", "your",
    "you", "my", "me", "we", "our", "us", "i", "all", "any", "each", "more", "less", "new", "now",
    "here", "there", "up", "down", "out", "off", "over", "into", "about", "per", "than", "then",
    "if", "so", "just", "only", "also", "very", "what", "how", "why", "when", "where", "who",
    // actions
    "add", "edit", "delete", "remove", "save", "cancel", "submit", "send", "share", "open",
    "close", "back", "next", "previous", "continue", "done", "ok", "confirm", "apply", "reset",
    "clear", "search", "filter", "sort", "view", "show", "hide", "load", "refresh",
    "update", "upload", "download", "copy", "paste", "print", "export", "import", "sign", "log",
    "login", "logout", "register", "subscribe", "unsubscribe", "follow", "like", "buy", "pay",
    "order", "checkout", "try", "start", "stop", "play", "pause", "select", "choose", "change",
    "enter", "create", "join", "leave", "invite", "accept", "decline", "read", "learn", "get",
    "see", "go", "call", "contact", "book", "reserve", "track", "manage", "welcome", "thanks",
    // nouns
    "home", "menu", "settings", "profile", "account", "user", "users", "name", "email",
    "password", "username", "phone", "address", "city", "country", "message", "messages",
    "notification", "notifications", "inbox", "cart", "item", "items", "product", "products",
    "price", "total", "subtotal", "tax", "shipping", "discount", "quantity", "amount", "balance",
    "payment", "card", "date", "time", "day", "week", "month", "year", "today", "tomorrow",
    "yesterday", "page", "pages", "list", "details", "summary", "overview", "dashboard", "help",
    "support", "faq", "terms", "privacy", "policy", "team", "blog", "news", "post",
    "posts", "comment", "comments", "reply", "review", "reviews", "rating", "photo", "photos",
    "image", "video", "file", "files", "document", "folder", "link", "title", "description",
    "status", "error", "warning", "success", "info", "note", "notes", "tag", "tags", "category",
    "categories", "language", "theme", "mode", "light", "dark", "size", "color", "style",
    "event", "events", "calendar", "schedule", "task", "tasks", "project", "projects", "report",
    "reports", "data", "stats", "history", "activity", "feed", "friends", "group", "groups",
    "chat", "store", "shop", "sale", "offer", "offers", "plan", "plans", "free", "pro", "premium",
    "trial", "code", "coupon", "gift", "wallet", "points", "rewards", "level", "score", "step",
    "steps", "result", "results", "question", "answer", "option", "options", "feature",
    "features", "version", "copyright", "rights", "reserved", "loading", "empty", "none",
    "required", "optional", "invalid", "available", "unavailable", "online", "offline",
    // numerals and units
    "0", "1", "2", "3", "4", "5", "10", "100", "%", "$", "x", "+", "-", "/", ":", "&",
];

const BASE_CLASS_PATHS: &[&str] = &[
    "box", "header", "hero", "list", "item", "card", "nav", "footer", "button", "link", "form",
    "field", "toggle", "grid", "row", "col", "modal", "text", "title", "image", "icon", "divider",
    "spacer", "button.primary", "button.secondary", "button.ghost", "button.danger", "text.muted",
    "text.small", "text.large", "text.bold", "title.large", "title.small", "card.wide",
    "card.compact", "list.inline", "item.active", "nav.tabs", "nav.bottom", "field.password",
    "field.email", "field.search", "image.avatar", "image.cover", "header.sticky", "hero.full",
    "grid.gallery", "modal.sheet", "link.muted", "icon.small",
];

/// One bidirectional value to index table.
#[derive(Debug, Clone)]
pub struct Table {
    name: &'static str,
    values: Vec<String>,
    index: HashMap<String, u16>,
    base_len: usize,
}

impl Table {
    fn new(name: &'static str, base: &[&str]) -> Self {
        let mut table = Self {
            name,
            values: Vec::with_capacity(base.len()),
            index: HashMap::with_capacity(base.len()),
            base_len: 0,
        };
        for value in base {
            table.index.insert(value.to_string(), table.values.len() as u16);
            table.values.push(value.to_string());
        }
        table.base_len = table.values.len();
        table
    }

    pub fn index_of(&self, value: &str) -> Option<u16> {
        self.index.get(value).copied()
    }

    pub fn value_at(&self, index: u16) -> Option<&str> {
        self.values.get(index as usize).map(String::as_str)
    }

    /// The index of `value`, appending it to the extension area if it is new.
    pub fn register_if_absent(&mut self, value: &str) -> Result<u16, DictionaryError> {
        if let Some(index) = self.index_of(value) {
            return Ok(index);
        }
        if value.is_empty() {
            return Err(DictionaryError::Empty { table: self.name });
        }
        if self.values.len() >= ESCAPE_LIMIT as usize {
            return Err(DictionaryError::Full {
                table: self.name,
                limit: ESCAPE_LIMIT,
            });
        }
        let index = self.values.len() as u16;
        self.values.push(value.to_string());
        self.index.insert(value.to_string(), index);
        log::debug!("registered {} entry '{value}' at {index}", self.name);
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Entries added past the base table, in registration order.
    pub fn extensions(&self) -> &[String] {
        &self.values[self.base_len..]
    }
}

/// A per-session dictionary. Both sides must hold the same extensions.
#[derive(Debug, Clone)]
pub struct Dictionary {
    words: Table,
    class_paths: Table,
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            words: Table::new("word", BASE_WORDS),
            class_paths: Table::new("class path", BASE_CLASS_PATHS),
        }
    }

    /// A dictionary holding the base tables plus another side's extensions.
    pub fn with_extensions<'a>(
        words: impl IntoIterator<Item = &'a str>,
        class_paths: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, DictionaryError> {
        let mut dictionary = Self::new();
        for word in words {
            dictionary.words.register_if_absent(word)?;
        }
        for path in class_paths {
            dictionary.class_paths.register_if_absent(path)?;
        }
        Ok(dictionary)
    }

    pub fn words(&self) -> &Table {
        &self.words
    }

    pub fn words_mut(&mut self) -> &mut Table {
        &mut self.words
    }

    pub fn class_paths(&self) -> &Table {
        &self.class_paths
    }

    pub fn class_paths_mut(&mut self) -> &mut Table {
        &mut self.class_paths
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}
