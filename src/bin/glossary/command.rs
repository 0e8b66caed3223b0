//! Chat line → [`Intent`] parsing.

use regex::Regex;

use glossary::{Intent, SearchKind};

/// A line that matched one of the routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub intent: Intent,
    /// Reply only when the term is known.
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy)]
enum Route {
    ListAll,
    Search,
    Remember,
    Forget,
    Info,
    Synonym,
    Lookup,
}

/// Case-insensitive route table, tried in order.
pub struct CommandParser {
    routes: Vec<(Route, Regex)>,
}

impl CommandParser {
    pub fn new() -> Result<Self, regex::Error> {
        let table = [
            (Route::ListAll, r"^what\s+do\s+you\s+remember\s*(\?\s*)?$"),
            (Route::Search, r"^search\s+(?P<kind>terms|definitions)\s+for\s+(?P<query>.*?)\s*$"),
            (Route::Remember, r"^remember\s+(?P<term>.+?)\s+(is|are)\s+(?P<definition>.+?)\s*$"),
            (Route::Forget, r"^forget(\s+about)?\s+(?P<term>.+?)\s*$"),
            (Route::Info, r"^who\s+added\s+(?P<term>.*?)\s*(\?\s*)?$"),
            (Route::Synonym, r"^(?P<term1>.+?)\s+(is|are)\s+also\s+(?P<term2>.+?)\s*$"),
            (Route::Lookup, r"^what('s|\s+(is|are))?\s+(?P<term>.*?)\s*(\?\s*)?$"),
            (Route::Lookup, r"^show\s+me\s+(?P<term>.*?)\s*(\.\s*)?$"),
        ];

        let routes = table
            .into_iter()
            .map(|(route, pattern)| Ok((route, Regex::new(&format!("(?i){pattern}"))?)))
            .collect::<Result<_, regex::Error>>()?;
        Ok(Self { routes })
    }

    /// Parse one line. Lines starting with `!` are addressed to the bot; others
    /// can only trigger a quiet lookup.
    pub fn parse(&self, line: &str) -> Option<Command> {
        let line = line.trim();
        let (addressed, text) = match line.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, line),
        };

        for (route, regex) in &self.routes {
            if !addressed && !matches!(route, Route::Lookup) {
                continue;
            }
            let Some(caps) = regex.captures(text) else {
                continue;
            };
            let group = |name: &str| caps.name(name).map_or("", |m| m.as_str()).to_string();

            let intent = match route {
                Route::ListAll => Intent::ListAll,
                Route::Search => Intent::Search {
                    kind: if group("kind").eq_ignore_ascii_case("terms") {
                        SearchKind::Terms
                    } else {
                        SearchKind::Definitions
                    },
                    query: group("query"),
                },
                Route::Remember => Intent::Remember {
                    term: group("term"),
                    definition: group("definition"),
                },
                Route::Forget => Intent::Forget { term: group("term") },
                Route::Info => Intent::Info { term: group("term") },
                Route::Synonym => Intent::Synonym {
                    term1: group("term1"),
                    term2: group("term2"),
                },
                Route::Lookup => Intent::Lookup { term: group("term") },
            };

            // Blank captures ("what is ?") are not worth a reply.
            if intent_has_blank_term(&intent) {
                return None;
            }
            return Some(Command {
                intent,
                quiet: !addressed,
            });
        }
        None
    }
}

fn intent_has_blank_term(intent: &Intent) -> bool {
    match intent {
        Intent::Lookup { term } | Intent::Info { term } | Intent::Forget { term } => {
            term.trim().is_empty()
        }
        Intent::Remember { term, .. } => term.trim().is_empty(),
        Intent::Synonym { term1, term2 } => term1.trim().is_empty() || term2.trim().is_empty(),
        Intent::Search { .. } | Intent::ListAll => false,
    }
}
