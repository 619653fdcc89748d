use once_cell::sync::Lazy;
use regex::Regex;

/// Language of a fenced code block, detected from its info string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    Kotlin,
    Swift,
    Ruby,
    C,
    Cpp,
    CSharp,
    Shell,
    Unknown,
}

/// Kind of declaration a pattern recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Function,
    Class,
}

/// A declaration line matched by [`Language::match_declaration`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: String,
}

type Patterns = Lazy<Vec<(DeclKind, Regex)>>;

fn compile(patterns: &[(DeclKind, &str)]) -> Vec<(DeclKind, Regex)> {
    patterns
        .iter()
        .map(|(kind, pattern)| (*kind, Regex::new(pattern).expect("valid declaration regex")))
        .collect()
}

static PYTHON: Patterns = Lazy::new(|| {
    compile(&[
        (DeclKind::Function, r"^(?:async\s+)?def\s+(?P<name>[A-Za-z_]\w*)\s*\("),
        (DeclKind::Class, r"^class\s+(?P<name>[A-Za-z_]\w*)\s*[(:]"),
    ])
});

static RUST: Patterns = Lazy::new(|| {
    compile(&[
        (
            DeclKind::Function,
            r#"^(?:pub(?:\([^)]*\))?\s+)?(?:(?:const|async|unsafe|default)\s+)*(?:extern\s+(?:"[^"]*"\s+)?)?fn\s+(?P<name>[A-Za-z_]\w*)"#,
        ),
        (
            DeclKind::Class,
            r"^(?:pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?(?:struct|enum|trait|union)\s+(?P<name>[A-Za-z_]\w*)",
        ),
        (
            DeclKind::Class,
            r"^(?:unsafe\s+)?impl(?:\s*<[^{]*?>)?\s+(?:[\w:]+(?:<[^{]*?>)?\s+for\s+)?(?:\w+::)*(?P<name>[A-Za-z_]\w*)",
        ),
    ])
});

static JAVASCRIPT: Patterns = Lazy::new(|| {
    compile(&[
        (
            DeclKind::Function,
            r"^(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)",
        ),
        (
            DeclKind::Function,
            r"^(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*=>|[A-Za-z_$][\w$]*\s*=>)",
        ),
        (
            DeclKind::Class,
            r"^(?:export\s+)?(?:default\s+)?class\s+(?P<name>[A-Za-z_$][\w$]*)",
        ),
    ])
});

static TYPESCRIPT: Patterns = Lazy::new(|| {
    compile(&[
        (
            DeclKind::Function,
            r"^(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:async\s+)?function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)",
        ),
        (
            DeclKind::Function,
            r"^(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)(?:\s*:[^=]+)?\s*=\s*(?:async\s+)?(?:function\b|(?:<[^>]*>\s*)?\([^)]*\)\s*(?::[^=]+)?=>|[A-Za-z_$][\w$]*\s*=>)",
        ),
        (
            DeclKind::Class,
            r"^(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?class\s+(?P<name>[A-Za-z_$][\w$]*)",
        ),
        (
            DeclKind::Class,
            r"^(?:export\s+)?(?:declare\s+)?(?:interface|(?:const\s+)?enum)\s+(?P<name>[A-Za-z_$][\w$]*)",
        ),
    ])
});

static GO: Patterns = Lazy::new(|| {
    compile(&[
        (
            DeclKind::Function,
            r"^func\s+(?:\([^)]*\)\s*)?(?P<name>[A-Za-z_]\w*)",
        ),
        (
            DeclKind::Class,
            r"^type\s+(?P<name>[A-Za-z_]\w*)(?:\[[^\]]*\])?\s+(?:struct|interface)\b",
        ),
    ])
});

static JAVA: Patterns = Lazy::new(|| {
    compile(&[
        (
            DeclKind::Class,
            r"^(?:(?:public|protected|private|abstract|final|static|sealed|non-sealed|strictfp)\s+)*(?:class|interface|enum|record|@interface)\s+(?P<name>[A-Za-z_$][\w$]*)",
        ),
        (
            DeclKind::Function,
            r"^(?:(?:public|protected|private|static|final|abstract|synchronized|native|default)\s+)+(?:<[^>]+>\s+)?[\w$<>\[\],.?]+(?:\s*<[^>]*>)?\s+(?P<name>[A-Za-z_$][\w$]*)\s*\(",
        ),
    ])
});

static KOTLIN: Patterns = Lazy::new(|| {
    compile(&[
        (
            DeclKind::Function,
            r"^(?:(?:public|private|protected|internal|open|override|suspend|inline|operator|infix|tailrec|abstract|final)\s+)*fun\s+(?:<[^>]+>\s*)?(?:[\w.]+\.)?(?P<name>[A-Za-z_]\w*)",
        ),
        (
            DeclKind::Class,
            r"^(?:(?:public|private|protected|internal|open|abstract|final|sealed|data|enum|inner|annotation|value)\s+)*(?:class|interface|object)\s+(?P<name>[A-Za-z_]\w*)",
        ),
    ])
});

static SWIFT: Patterns = Lazy::new(|| {
    compile(&[
        (
            DeclKind::Function,
            r"^(?:(?:public|private|fileprivate|internal|open|static|class|final|override|mutating|@\w+)\s+)*func\s+(?P<name>[A-Za-z_]\w*)",
        ),
        (
            DeclKind::Class,
            r"^(?:(?:public|private|fileprivate|internal|open|final)\s+)*(?:class|struct|enum|protocol|extension|actor)\s+(?P<name>[A-Za-z_]\w*)",
        ),
    ])
});

static RUBY: Patterns = Lazy::new(|| {
    compile(&[
        (
            DeclKind::Function,
            r"^def\s+(?:self\.)?(?P<name>[A-Za-z_]\w*[?!=]?)",
        ),
        (
            DeclKind::Class,
            r"^(?:class|module)\s+(?P<name>[A-Z]\w*(?:::[A-Z]\w*)*)",
        ),
    ])
});

impl Language {
    /// Detect language from a fence info-string tag (`python`, `rs`, `tsx`, ...)
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "rust" | "rs" => Language::Rust,
            "python" | "py" | "python3" | "py3" | "pyw" => Language::Python,
            "javascript" | "js" | "jsx" | "mjs" | "cjs" | "node" => Language::JavaScript,
            "typescript" | "ts" | "tsx" => Language::TypeScript,
            "go" | "golang" => Language::Go,
            "java" => Language::Java,
            "kotlin" | "kt" | "kts" => Language::Kotlin,
            "swift" => Language::Swift,
            "ruby" | "rb" => Language::Ruby,
            "c" | "h" => Language::C,
            "cpp" | "c++" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "csharp" | "cs" | "c#" => Language::CSharp,
            "bash" | "sh" | "shell" | "zsh" | "console" => Language::Shell,
            _ => Language::Unknown,
        }
    }

    /// Detect language from an optional fence tag
    pub fn from_fence_tag(tag: Option<&str>) -> Self {
        tag.map(Self::from_tag).unwrap_or(Language::Unknown)
    }

    /// Get language name as string
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::Swift => "swift",
            Language::Ruby => "ruby",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Shell => "shell",
            Language::Unknown => "unknown",
        }
    }

    fn patterns(self) -> Option<&'static [(DeclKind, Regex)]> {
        let patterns: &'static Patterns = match self {
            Language::Rust => &RUST,
            Language::Python => &PYTHON,
            Language::JavaScript => &JAVASCRIPT,
            Language::TypeScript => &TYPESCRIPT,
            Language::Go => &GO,
            Language::Java => &JAVA,
            Language::Kotlin => &KOTLIN,
            Language::Swift => &SWIFT,
            Language::Ruby => &RUBY,
            Language::C | Language::Cpp | Language::CSharp | Language::Shell | Language::Unknown => {
                return None
            }
        };
        Some(patterns.as_slice())
    }

    /// Check if function/class boundaries can be detected for this language
    pub fn supports_declarations(self) -> bool {
        self.patterns().is_some()
    }

    /// Match a line (indentation already stripped) against declaration patterns
    pub fn match_declaration(self, line: &str) -> Option<Declaration> {
        self.patterns()?.iter().find_map(|(kind, re)| {
            re.captures(line).and_then(|caps| {
                caps.name("name").map(|name| Declaration {
                    kind: *kind,
                    name: name.as_str().to_string(),
                })
            })
        })
    }

    /// Get typical comment prefixes for this language
    pub fn comment_prefixes(self) -> Vec<&'static str> {
        match self {
            Language::Rust
            | Language::JavaScript
            | Language::TypeScript
            | Language::Go
            | Language::Java
            | Language::C
            | Language::Cpp
            | Language::CSharp
            | Language::Swift
            | Language::Kotlin => vec!["//", "/*", "///", "/**", "*"],
            Language::Python | Language::Ruby | Language::Shell => vec!["#"],
            Language::Unknown => vec![],
        }
    }

    /// Prefixes of lines that attach to the declaration directly below them
    /// (decorators, attributes, doc comments).
    pub fn attached_prefixes(self) -> Vec<&'static str> {
        let mut prefixes = self.comment_prefixes();
        match self {
            Language::Rust => prefixes.push("#["),
            Language::Python
            | Language::JavaScript
            | Language::TypeScript
            | Language::Java
            | Language::Kotlin
            | Language::Swift => prefixes.push("@"),
            _ => {}
        }
        prefixes
    }

    /// Check if a base-level line only closes an open construct
    /// (`}`, `)`, `]`, Ruby `end`)
    pub fn is_closer(self, trimmed: &str) -> bool {
        if trimmed.starts_with(['}', ')', ']']) {
            return true;
        }
        self == Language::Ruby
            && trimmed
                .strip_prefix("end")
                .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(language: Language, line: &str) -> Option<(DeclKind, String)> {
        language
            .match_declaration(line)
            .map(|d| (d.kind, d.name))
    }

    #[test]
    fn test_from_tag() {
        assert_eq!(Language::from_tag("rs"), Language::Rust);
        assert_eq!(Language::from_tag("Rust"), Language::Rust);
        assert_eq!(Language::from_tag("py"), Language::Python);
        assert_eq!(Language::from_tag("js"), Language::JavaScript);
        assert_eq!(Language::from_tag("tsx"), Language::TypeScript);
        assert_eq!(Language::from_tag("mermaid"), Language::Unknown);
        assert_eq!(Language::from_fence_tag(None), Language::Unknown);
    }

    #[test]
    fn test_supports_declarations() {
        assert!(Language::Rust.supports_declarations());
        assert!(Language::Python.supports_declarations());
        assert!(Language::Go.supports_declarations());
        assert!(!Language::Shell.supports_declarations());
        assert!(!Language::Cpp.supports_declarations());
        assert!(!Language::Unknown.supports_declarations());
    }

    #[test]
    fn python_declarations() {
        let py = Language::Python;
        assert_eq!(decl(py, "def f():"), Some((DeclKind::Function, "f".into())));
        assert_eq!(
            decl(py, "async def fetch(url):"),
            Some((DeclKind::Function, "fetch".into()))
        );
        assert_eq!(
            decl(py, "class ChatBot:"),
            Some((DeclKind::Class, "ChatBot".into()))
        );
        assert_eq!(
            decl(py, "class Foo(Base):"),
            Some((DeclKind::Class, "Foo".into()))
        );
        assert_eq!(decl(py, "define = 3"), None);
        assert_eq!(decl(py, "result = chain.run()"), None);
    }

    #[test]
    fn rust_declarations() {
        let rs = Language::Rust;
        assert_eq!(
            decl(rs, "pub(crate) async fn load() -> Result<()> {"),
            Some((DeclKind::Function, "load".into()))
        );
        assert_eq!(
            decl(rs, "pub struct Point {"),
            Some((DeclKind::Class, "Point".into()))
        );
        assert_eq!(
            decl(rs, "impl<T: Into<String>> Display for Wrapper<T> {"),
            Some((DeclKind::Class, "Wrapper".into()))
        );
        assert_eq!(decl(rs, "impl Point {"), Some((DeclKind::Class, "Point".into())));
        assert_eq!(decl(rs, "let fnord = 1;"), None);
    }

    #[test]
    fn script_declarations() {
        assert_eq!(
            decl(Language::JavaScript, "export async function load(a) {"),
            Some((DeclKind::Function, "load".into()))
        );
        assert_eq!(
            decl(Language::JavaScript, "const handler = async (req) => {"),
            Some((DeclKind::Function, "handler".into()))
        );
        assert_eq!(
            decl(Language::TypeScript, "const add = (a: number, b: number): number => a + b;"),
            Some((DeclKind::Function, "add".into()))
        );
        assert_eq!(
            decl(Language::TypeScript, "export interface Props {"),
            Some((DeclKind::Class, "Props".into()))
        );
        assert_eq!(decl(Language::JavaScript, "const x = 5;"), None);
    }

    #[test]
    fn other_declarations() {
        assert_eq!(
            decl(Language::Go, "func (s *Server) Start() error {"),
            Some((DeclKind::Function, "Start".into()))
        );
        assert_eq!(
            decl(Language::Go, "type Server struct {"),
            Some((DeclKind::Class, "Server".into()))
        );
        assert_eq!(
            decl(Language::Java, "public static void main(String[] args) {"),
            Some((DeclKind::Function, "main".into()))
        );
        assert_eq!(
            decl(Language::Java, "public final class App {"),
            Some((DeclKind::Class, "App".into()))
        );
        assert_eq!(
            decl(Language::Ruby, "def valid?"),
            Some((DeclKind::Function, "valid?".into()))
        );
        assert_eq!(
            decl(Language::Kotlin, "data class User(val id: Int)"),
            Some((DeclKind::Class, "User".into()))
        );
        assert_eq!(
            decl(Language::Swift, "public func run() {"),
            Some((DeclKind::Function, "run".into()))
        );
    }

    #[test]
    fn test_closers() {
        assert!(Language::Rust.is_closer("}"));
        assert!(Language::JavaScript.is_closer("});"));
        assert!(Language::Ruby.is_closer("end"));
        assert!(!Language::Ruby.is_closer("ending = 1"));
        assert!(!Language::Python.is_closer("end"));
    }

    #[test]
    fn test_attached_prefixes() {
        assert!(Language::Python.attached_prefixes().contains(&"@"));
        assert!(Language::Rust.attached_prefixes().contains(&"#["));
        assert!(Language::Rust.attached_prefixes().contains(&"///"));
        assert!(Language::Unknown.attached_prefixes().is_empty());
    }
}
