/// Sources at or above this line count always take the full pipeline.
const FAST_PATH_LINE_LIMIT: usize = 30;

/// Standard library packages a source may import and still qualify for
/// `go run` dispatch.
const ALLOWED_IMPORTS: [&str; 5] = ["fmt", "strings", "time", "math", "os"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPath {
    /// Single-step `go run` for short sources with only allow-listed imports.
    Fast,
    /// Separate compile and run steps.
    Full,
}

/// Picks the execution path for a source. Fast requires fewer than
/// `FAST_PATH_LINE_LIMIT` lines and every import resolvable to the
/// allow-list; anything else, including import syntax this parser cannot
/// make sense of, takes the full path. The choice affects latency only,
/// both paths execute the code with identical privileges.
pub fn classify(source: &str) -> ExecutionPath {
    if source.split('\n').count() >= FAST_PATH_LINE_LIMIT {
        return ExecutionPath::Full;
    }
    match imported_packages(source) {
        Some(imports)
            if imports
                .iter()
                .all(|path| ALLOWED_IMPORTS.contains(&path.as_str())) =>
        {
            ExecutionPath::Fast
        }
        _ => ExecutionPath::Full,
    }
}

/// Collects every package path named by an import declaration: single
/// specs, aliased, dot and blank forms, and parenthesized groups spanning
/// multiple lines. Returns `None` when an import line does not parse.
fn imported_packages(source: &str) -> Option<Vec<String>> {
    let mut imports = Vec::new();
    let mut in_group = false;

    for raw in source.lines() {
        let line = strip_line_comment(raw).trim();

        if in_group {
            if line.is_empty() {
                continue;
            }
            let (body, closes) = match line.strip_suffix(')') {
                Some(rest) => (rest.trim_end(), true),
                None => (line, false),
            };
            if !body.is_empty() {
                push_specs(body, &mut imports)?;
            }
            if closes {
                in_group = false;
            }
            continue;
        }

        let Some(rest) = import_declaration(line) else {
            continue;
        };
        if rest.is_empty() {
            return None;
        }
        if let Some(group) = rest.strip_prefix('(') {
            let group = group.trim();
            match group.strip_suffix(')') {
                Some(inline) => push_specs(inline.trim_end(), &mut imports)?,
                None => {
                    if !group.is_empty() {
                        push_specs(group, &mut imports)?;
                    }
                    in_group = true;
                }
            }
        } else {
            push_specs(rest, &mut imports)?;
        }
    }

    if in_group {
        return None;
    }
    Some(imports)
}

/// Returns the text after the `import` keyword, or `None` when the line is
/// not an import declaration at all.
fn import_declaration(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("import")?;
    match rest.chars().next() {
        Some(c) if c.is_whitespace() || c == '(' => Some(rest.trim_start()),
        Some(_) => None,
        None => Some(""),
    }
}

fn push_specs(body: &str, imports: &mut Vec<String>) -> Option<()> {
    for spec in body.split(';') {
        let spec = spec.trim();
        if spec.is_empty() {
            continue;
        }
        imports.push(quoted_path(spec)?);
    }
    Some(())
}

/// Extracts the quoted package path from one import spec, e.g. `"fmt"`,
/// `f "fmt"`, `. "math"` or `_ "os"`.
fn quoted_path(spec: &str) -> Option<String> {
    let open = spec.find('"')?;
    if !valid_alias(spec[..open].trim_end()) {
        return None;
    }
    let rest = &spec[open + 1..];
    let close = rest.find('"')?;
    if !rest[close + 1..].trim().is_empty() {
        return None;
    }
    let path = &rest[..close];
    if path.is_empty() {
        return None;
    }
    Some(path.to_string())
}

fn valid_alias(alias: &str) -> bool {
    if alias.is_empty() || alias == "." {
        return true;
    }
    let mut chars = alias.chars();
    chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn strip_line_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => in_string = !in_string,
            b'\\' if in_string => i += 1,
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'/') => return &line[..i],
            _ => {}
        }
        i += 1;
    }
    line
}

#[cfg(test)]
mod tests {
    use super::{ExecutionPath, classify, imported_packages};

    const HELLO: &str = r#"package main

import "fmt"

func main() {
	fmt.Println("hi")
}
"#;

    #[test]
    fn short_allowed_source_is_fast() {
        assert_eq!(classify(HELLO), ExecutionPath::Fast);
    }

    #[test]
    fn classification_is_deterministic() {
        assert_eq!(classify(HELLO), classify(HELLO));
    }

    #[test]
    fn source_without_imports_is_fast() {
        assert_eq!(
            classify("package main\n\nfunc main() {}\n"),
            ExecutionPath::Fast
        );
    }

    #[test]
    fn disallowed_import_is_full() {
        let src = r#"package main

import "net/http"

func main() {
	http.Get("http://example.com")
}
"#;
        assert_eq!(classify(src), ExecutionPath::Full);
    }

    #[test]
    fn line_count_alone_routes_full() {
        let mut src = String::from("package main\n\nimport \"fmt\"\n\nfunc main() {\n");
        for i in 0..30 {
            src.push_str(&format!("\tfmt.Println({i})\n"));
        }
        src.push_str("}\n");
        assert_eq!(classify(&src), ExecutionPath::Full);
    }

    #[test]
    fn line_limit_boundary() {
        let body = "// pad\n".repeat(28);
        assert_eq!(classify(&format!("{body}end")), ExecutionPath::Fast);
        let body = "// pad\n".repeat(29);
        assert_eq!(classify(&format!("{body}end")), ExecutionPath::Full);
    }

    #[test]
    fn grouped_imports_are_parsed() {
        let src = r#"package main

import (
	"fmt"
	"strings"
)

func main() {
	fmt.Println(strings.ToUpper("hi"))
}
"#;
        assert_eq!(classify(src), ExecutionPath::Fast);
    }

    #[test]
    fn disallowed_import_inside_group_is_full() {
        let src = r#"package main

import (
	"fmt"
	"net"
)

func main() {}
"#;
        assert_eq!(classify(src), ExecutionPath::Full);
    }

    #[test]
    fn aliased_dot_and_blank_imports_resolve_to_their_path() {
        let allowed = r#"package main

import (
	f "fmt"
	. "math"
	_ "os"
)

func main() { f.Println(Pi) }
"#;
        assert_eq!(classify(allowed), ExecutionPath::Fast);

        let hidden = "package main\n\nimport n \"net\"\n\nfunc main() {}\n";
        assert_eq!(classify(hidden), ExecutionPath::Full);
    }

    #[test]
    fn inline_group_forms_are_parsed() {
        assert_eq!(
            classify("package main\n\nimport (\"fmt\"; \"os\")\n\nfunc main() {}\n"),
            ExecutionPath::Fast
        );
        assert_eq!(
            classify("package main\n\nimport ( \"fmt\"\n\t\"net\")\n\nfunc main() {}\n"),
            ExecutionPath::Full
        );
    }

    #[test]
    fn comments_do_not_hide_imports() {
        let src = r#"package main

import (
	// standard output
	"fmt"
	"os" // files
)

func main() {}
"#;
        assert_eq!(classify(src), ExecutionPath::Fast);

        let commented_net = "package main\n\nimport \"net\" // tiny\n\nfunc main() {}\n";
        assert_eq!(classify(commented_net), ExecutionPath::Full);
    }

    #[test]
    fn subpath_of_an_allowed_package_is_full() {
        assert_eq!(
            classify("package main\n\nimport \"os/exec\"\n\nfunc main() {}\n"),
            ExecutionPath::Full
        );
    }

    #[test]
    fn malformed_imports_route_full() {
        // Missing quotes.
        assert_eq!(
            classify("package main\n\nimport fmt\n\nfunc main() {}\n"),
            ExecutionPath::Full
        );
        // Unterminated group.
        assert_eq!(
            classify("package main\n\nimport (\n\t\"fmt\"\n\nfunc main() {}\n"),
            ExecutionPath::Full
        );
        // Bare keyword.
        assert_eq!(
            classify("package main\n\nimport\n\nfunc main() {}\n"),
            ExecutionPath::Full
        );
    }

    #[test]
    fn parser_reports_malformed_specs_as_unparseable() {
        assert!(imported_packages("import \"fmt").is_none());
        assert!(imported_packages("import \"fmt\" extra").is_none());
        assert!(imported_packages("import 2x \"fmt\"").is_none());
        assert_eq!(
            imported_packages("import \"fmt\"").as_deref(),
            Some(&["fmt".to_string()][..])
        );
    }
}
