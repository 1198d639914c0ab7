//! Variable substitution for raw pipeline definitions.
//!
//! Placeholders use the `CI_*` family derived from the build context:
//! - `${CI_REPO}`, `${CI_REPO_OWNER}`, `${CI_REPO_NAME}`, `${CI_REPO_LINK}`, ...
//! - `${CI_COMMIT_SHA}`, `${CI_COMMIT_BRANCH}`, `${CI_COMMIT_TAG}`, `${CI_COMMIT_MESSAGE}`, ...
//! - `${CI_BUILD_NUMBER}`, `${CI_BUILD_EVENT}`, `${CI_BUILD_LINK}`, ...
//! - `${CI_PREV_BUILD_STATUS}`, `${CI_PREV_COMMIT_SHA}`, ...
//! - `${CI_PIPELINE_NAME}` - Name of the definition being compiled
//!
//! Supported forms:
//! - `${NAME}` - value, empty when unknown
//! - `${NAME=default}` - `default` when the value is empty
//! - `${NAME^^}` / `${NAME,,}` - upper / lower case
//! - `${NAME#prefix}` / `${NAME%suffix}` - strip a prefix / suffix
//! - `$${NAME}` - the literal text `${NAME}`
//!
//! Substitution knows where it is in the KDL text: inside a quoted or
//! multi-line string the value is string-escaped, anywhere else the bare token
//! holding the placeholder becomes one quoted string.
//! Raw strings and comments are copied untouched. Either way a value spanning
//! several lines cannot break the document.

use buildgraph_core::BuildContext;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Name reported in `CI_SYSTEM_NAME` unless overridden.
pub const DEFAULT_SYSTEM_NAME: &str = "buildgraph";

const MULTI_LINE_QUOTE: &str = "\"\"\"";

// Contents of a `${...}` placeholder
static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)(?:(\^\^|,,)|([=#%])(.*))?$").unwrap()
});

/// Variables available to a definition's text and to its steps' environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableContext {
    vars: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    Quoted,
    MultiLine,
    Raw(usize),
    LineComment,
    BlockComment(usize),
}

impl VariableContext {
    /// Create a new empty variable context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the `CI_*` variables of a build.
    pub fn from_build_context(ctx: &BuildContext) -> Self {
        let mut vars = Self::new();
        let repo = &ctx.repo;
        let build = &ctx.curr;

        vars.set("CI", "true");
        vars.set("CI_SYSTEM_NAME", DEFAULT_SYSTEM_NAME);
        vars.set("CI_SYSTEM_LINK", &ctx.link);

        vars.set("CI_REPO", &repo.full_name);
        vars.set("CI_REPO_OWNER", &repo.owner);
        vars.set("CI_REPO_NAME", &repo.name);
        vars.set("CI_REPO_SCM", "git");
        vars.set("CI_REPO_PROVIDER", repo.provider.to_string());
        vars.set("CI_REPO_LINK", &repo.link);
        vars.set("CI_REPO_CLONE_URL", &repo.clone_url);
        vars.set("CI_REPO_DEFAULT_BRANCH", &repo.default_branch);
        vars.set("CI_REPO_PRIVATE", repo.is_private.to_string());

        vars.set("CI_COMMIT_SHA", &build.commit);
        vars.set("CI_COMMIT_REF", &build.git_ref);
        vars.set("CI_COMMIT_BRANCH", &build.branch);
        vars.set("CI_COMMIT_TAG", build.tag().unwrap_or_default());
        vars.set("CI_COMMIT_MESSAGE", &build.message);
        vars.set("CI_COMMIT_AUTHOR", &build.author);
        vars.set("CI_COMMIT_AUTHOR_EMAIL", &build.author_email);
        vars.set("CI_COMMIT_AUTHOR_AVATAR", &build.author_avatar);
        vars.set("CI_COMMIT_LINK", &build.link);

        vars.set("CI_BUILD_NUMBER", build.number.to_string());
        vars.set("CI_BUILD_EVENT", build.event.as_str());
        vars.set("CI_BUILD_STATUS", build.status.as_str());
        vars.set("CI_BUILD_CREATED", build.created_at.timestamp().to_string());
        vars.set("CI_BUILD_DEPLOY_TARGET", &build.deploy_to);
        vars.set(
            "CI_BUILD_LINK",
            build_link(&ctx.link, &repo.full_name, build.number).unwrap_or_default(),
        );

        if let Some(last) = &ctx.last {
            vars.set("CI_PREV_BUILD_NUMBER", last.number.to_string());
            vars.set("CI_PREV_BUILD_STATUS", last.status.as_str());
            vars.set("CI_PREV_BUILD_EVENT", last.event.as_str());
            vars.set("CI_PREV_COMMIT_SHA", &last.commit);
            vars.set("CI_PREV_COMMIT_BRANCH", &last.branch);
        }

        vars
    }

    /// Scope the variables to one pipeline definition.
    pub fn with_pipeline(mut self, name: &str) -> Self {
        self.set("CI_PIPELINE_NAME", name);
        self
    }

    pub fn with_system_name(mut self, name: &str) -> Self {
        self.set("CI_SYSTEM_NAME", name);
        self
    }

    /// Add or replace a variable.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.vars.insert(name.to_string(), value.into());
    }

    /// Resolve a variable name to its value.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// All variables, for use as a step environment.
    pub fn environ(&self) -> BTreeMap<String, String> {
        self.vars.clone()
    }

    /// Replace every placeholder in a KDL document.
    pub fn substitute(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut state = Scan::Code;
        let mut i = 0;

        while let Some(ch) = input[i..].chars().next() {
            let rest = &input[i..];

            match state {
                Scan::Code => {
                    if rest.starts_with("//") {
                        state = Scan::LineComment;
                    } else if rest.starts_with("/*") {
                        out.push_str("/*");
                        i += 2;
                        state = Scan::BlockComment(1);
                        continue;
                    } else if let Some(hashes) = raw_string_start(rest) {
                        out.push_str(&rest[..=hashes]);
                        i += hashes + 1;
                        state = Scan::Raw(hashes);
                        continue;
                    } else if rest.starts_with(MULTI_LINE_QUOTE) {
                        out.push_str(MULTI_LINE_QUOTE);
                        i += MULTI_LINE_QUOTE.len();
                        state = Scan::MultiLine;
                        continue;
                    } else if ch == '"' {
                        state = Scan::Quoted;
                    } else if !is_bare_terminator(ch) {
                        let token = &rest[..bare_token_len(rest)];
                        match self.expand_token(token) {
                            Some(text) => out.push_str(&text),
                            None => out.push_str(token),
                        }
                        i += token.len();
                        continue;
                    }
                }
                Scan::Quoted | Scan::MultiLine => {
                    if ch == '\\' {
                        let escaped = rest[1..].chars().next().map_or(0, char::len_utf8);
                        out.push_str(&rest[..1 + escaped]);
                        i += 1 + escaped;
                        continue;
                    } else if state == Scan::MultiLine && rest.starts_with(MULTI_LINE_QUOTE) {
                        out.push_str(MULTI_LINE_QUOTE);
                        i += MULTI_LINE_QUOTE.len();
                        state = Scan::Code;
                        continue;
                    } else if state == Scan::Quoted && ch == '"' {
                        state = Scan::Code;
                    } else if let Some((consumed, text)) = self.expand(rest) {
                        out.push_str(&text);
                        i += consumed;
                        continue;
                    }
                }
                Scan::Raw(hashes) => {
                    if ch == '"' && rest[1..].bytes().take_while(|b| *b == b'#').count() >= hashes
                    {
                        out.push_str(&rest[..=hashes]);
                        i += hashes + 1;
                        state = Scan::Code;
                        continue;
                    }
                }
                Scan::LineComment => {
                    if ch == '\n' {
                        state = Scan::Code;
                    }
                }
                Scan::BlockComment(depth) => {
                    if rest.starts_with("/*") {
                        out.push_str("/*");
                        i += 2;
                        state = Scan::BlockComment(depth + 1);
                        continue;
                    } else if rest.starts_with("*/") {
                        out.push_str("*/");
                        i += 2;
                        state = if depth == 1 {
                            Scan::Code
                        } else {
                            Scan::BlockComment(depth - 1)
                        };
                        continue;
                    }
                }
            }

            out.push(ch);
            i += ch.len_utf8();
        }

        out
    }

    /// Turn a bare token holding placeholders into one quoted string.
    /// `None` when the token has nothing to expand.
    fn expand_token(&self, token: &str) -> Option<String> {
        let mut text = String::from('"');
        let mut expanded = false;
        let mut j = 0;

        while let Some(ch) = token[j..].chars().next() {
            if let Some((consumed, value)) = self.expand(&token[j..]) {
                text.push_str(&value);
                expanded = true;
                j += consumed;
            } else {
                text.push(ch);
                j += ch.len_utf8();
            }
        }

        text.push('"');
        expanded.then_some(text)
    }

    /// Expand a placeholder at the start of `rest` into string-escaped text,
    /// returning the bytes consumed. `None` means the text is copied literally.
    fn expand(&self, rest: &str) -> Option<(usize, String)> {
        if let Some(escaped) = rest.strip_prefix("$${") {
            let end = escaped.find(['}', '\n'])?;
            if !escaped[end..].starts_with('}') {
                return None;
            }
            return Some((end + 4, format!("${{{}}}", &escaped[..end])));
        }

        let body = rest.strip_prefix("${")?;
        let end = body.find(['}', '\n'])?;
        if !body[end..].starts_with('}') {
            return None;
        }
        let value = self.evaluate(&body[..end])?;
        Some((end + 3, escape_kdl(&value)))
    }

    fn evaluate(&self, expr: &str) -> Option<String> {
        let caps = PLACEHOLDER_REGEX.captures(expr)?;
        let value = self.resolve(&caps[1]).unwrap_or_default();

        let result = if let Some(case) = caps.get(2) {
            if case.as_str() == "^^" {
                value.to_uppercase()
            } else {
                value.to_lowercase()
            }
        } else if let (Some(op), Some(arg)) = (caps.get(3), caps.get(4)) {
            let arg = arg.as_str();
            match op.as_str() {
                "=" if value.is_empty() => arg.to_string(),
                "#" => value.strip_prefix(arg).unwrap_or(value).to_string(),
                "%" => value.strip_suffix(arg).unwrap_or(value).to_string(),
                _ => value.to_string(),
            }
        } else {
            value.to_string()
        };

        Some(result)
    }
}

/// Characters that cannot appear in a bare KDL identifier.
fn is_bare_terminator(ch: char) -> bool {
    ch.is_whitespace()
        || matches!(
            ch,
            '(' | ')' | '{' | '}' | '[' | ']' | '/' | '\\' | '"' | '#' | ';' | '='
        )
}

/// Length of a `${...}` or `$${...}` placeholder at the start of `rest`.
fn placeholder_len(rest: &str) -> Option<usize> {
    let body = rest
        .strip_prefix("$${")
        .or_else(|| rest.strip_prefix("${"))?;
    let end = body.find(['}', '\n'])?;
    body[end..]
        .starts_with('}')
        .then(|| rest.len() - body.len() + end + 1)
}

/// Length of the bare token at the start of `rest`. Placeholders count as
/// part of the token even though their braces would end it.
fn bare_token_len(rest: &str) -> usize {
    let mut j = 0;
    while let Some(ch) = rest[j..].chars().next() {
        if let Some(len) = placeholder_len(&rest[j..]) {
            j += len;
        } else if is_bare_terminator(ch) {
            break;
        } else {
            j += ch.len_utf8();
        }
    }
    j
}

/// Number of `#` characters opening a raw string at the start of `rest`.
fn raw_string_start(rest: &str) -> Option<usize> {
    let hashes = rest.bytes().take_while(|b| *b == b'#').count();
    (hashes > 0 && rest[hashes..].starts_with('"')).then_some(hashes)
}

/// Escape a value for use inside a quoted KDL string.
fn escape_kdl(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Link to a build page: `<server>/<owner>/<name>/<number>`.
fn build_link(server: &str, full_name: &str, number: u64) -> Option<String> {
    let mut url = url::Url::parse(server).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(full_name.split('/'))
        .push(&number.to_string());
    Some(url.to_string())
}
