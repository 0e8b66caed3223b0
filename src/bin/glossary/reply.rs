//! English replies.

use std::collections::HashMap;

use glossary::{
    AuthorId, ForgetOutcome, InfoOutcome, LookupOutcome, Outcome, RememberOutcome,
    SearchOutcome, SynonymOutcome, SynonymReason, TermListing,
};

/// Display names of known users, by id.
pub type Names = HashMap<AuthorId, String>;

/// Reply to a command the store could not serve.
pub const UNAVAILABLE: &str = "I can't reach my memory right now, try again later";

/// Render an outcome. `None` means stay silent.
pub fn render(outcome: &Outcome, quiet: bool, names: &Names) -> Option<String> {
    match outcome {
        Outcome::Lookup(lookup) => render_lookup(lookup, quiet),
        Outcome::Info(info) => Some(render_info(info, names)),
        Outcome::Remember(remember) => Some(render_remember(remember)),
        Outcome::Synonym(synonym) => Some(render_synonym(synonym)),
        Outcome::Forget(forget) => Some(render_forget(forget)),
        Outcome::Search(search) => Some(render_search(search)),
        Outcome::ListAll(listing) => Some(render_listing(listing)),
    }
}

fn render_lookup(lookup: &LookupOutcome, quiet: bool) -> Option<String> {
    match &lookup.definition {
        Some(definition) => Some(format!("{} is {definition}", lookup.queried_term)),
        None if quiet => None,
        None => Some(format!("I don't know what {} is", lookup.queried_term)),
    }
}

fn render_info(info: &InfoOutcome, names: &Names) -> String {
    let (Some(author_id), Some(canonical)) = (&info.author_id, &info.canonical_term) else {
        return format!("I don't know what {} is", info.queried_term);
    };
    let author = names.get(author_id).map_or(author_id.as_str(), String::as_str);
    let times = plural(info.hits, "time", "times");

    if info.is_alias {
        format!(
            "{} is a synonym of {canonical}, added by {author} and looked up {} {times}",
            info.queried_term, info.hits
        )
    } else {
        format!(
            "{} is {}, added by {author} and looked up {} {times}",
            info.queried_term,
            info.definition.as_deref().unwrap_or_default(),
            info.hits
        )
    }
}

fn render_remember(remember: &RememberOutcome) -> String {
    if remember.blocked_because_existing {
        format!(
            "I already know {}; it is {}",
            remember.term, remember.definition
        )
    } else {
        format!("OK, I'll remember {} is {}", remember.term, remember.definition)
    }
}

fn render_synonym(synonym: &SynonymOutcome) -> String {
    match synonym.reason {
        SynonymReason::Ok => match (&synonym.alias, &synonym.target) {
            (Some(alias), Some(target)) => format!("{alias} is a synonym of {target}"),
            _ => "OK".to_string(),
        },
        SynonymReason::BothKnown => format!(
            "I already know both {} and {}",
            synonym.term1, synonym.term2
        ),
        SynonymReason::NeitherKnown => format!(
            "I don't know {} or {}",
            synonym.term1, synonym.term2
        ),
        SynonymReason::AliasTaken => format!(
            "someone just defined {}, ask again",
            synonym.alias.as_ref().map_or(synonym.term1.as_str(), |a| a.as_str())
        ),
        SynonymReason::SelfReference => format!("{} is already {}", synonym.term1, synonym.term2),
    }
}

fn render_forget(forget: &ForgetOutcome) -> String {
    if forget.denied {
        "only admins can make me forget things".to_string()
    } else if forget.deleted {
        format!("I've forgotten {}", forget.term)
    } else {
        format!("I don't remember {} anyway", forget.term)
    }
}

fn render_search(search: &SearchOutcome) -> String {
    if search.matches.is_empty() {
        return format!("no {} match {}", search.kind.as_str(), search.query);
    }
    bullet_list("matching terms:", search.matches.iter().map(|t| t.as_str()))
}

fn render_listing(listing: &TermListing) -> String {
    match listing {
        TermListing::FullList { terms } if terms.is_empty() => {
            "I don't remember anything yet".to_string()
        }
        TermListing::FullList { terms } => {
            bullet_list("I remember:", terms.iter().map(|t| t.as_str()))
        }
        TermListing::RankedSample {
            sampled_terms,
            total_count,
        } => bullet_list(
            &format!(
                "showing top {} of {total_count} terms (ask me in private for all of them):",
                sampled_terms.len()
            ),
            sampled_terms.iter().map(|t| t.as_str()),
        ),
    }
}

fn bullet_list<'a>(heading: &str, items: impl Iterator<Item = &'a str>) -> String {
    let mut out = heading.to_string();
    for item in items {
        out.push_str("\n - ");
        out.push_str(item);
    }
    out
}

fn plural(n: u64, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 {
        one
    } else {
        many
    }
}
