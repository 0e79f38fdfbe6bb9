//! Web augmentation gating and query construction for hybrid retrieval.

/// Official legal-publication domains. Web search is restricted to these,
/// and the synthesizer treats them as trustworthy sources.
pub const ALLOWLIST: &[&str] = &[
    "cortedicassazione.it",
    "italgiure.giustizia.it",
    "giustizia-amministrativa.it",
    "cortecostituzionale.it",
    "normattiva.it",
    "gazzettaufficiale.it",
    "eur-lex.europa.eu",
    "curia.europa.eu",
    "hudoc.echr.coe.int",
];

/// Lowercase terms that mark a query as being about case law: ruling,
/// Court of Cassation, case law, plenary session, Constitutional Court,
/// CJEU, ECHR.
pub const CASE_LAW_TERMS: &[&str] = &[
    "sentenza",
    "cass",
    "giurisprudenza",
    "sezioni unite",
    "corte cost",
    "cgue",
    "cedu",
];

/// Case-insensitive substring match against [`CASE_LAW_TERMS`].
pub fn looks_like_case_query(query: &str) -> bool {
    let q = query.to_lowercase();
    CASE_LAW_TERMS.iter().any(|term| q.contains(term))
}

/// Whether a query should be augmented with web results.
pub fn wants_web(query: &str, force_web_for_cases: bool) -> bool {
    force_web_for_cases || looks_like_case_query(query)
}

/// Append a `site:` restriction for every allowlisted domain.
///
/// ```rust
/// use ius_civile_core::retrieve::site_restricted_query;
///
/// let q = site_restricted_query("usucapione", &["normattiva.it", "curia.europa.eu"]);
/// assert_eq!(q, "usucapione site:normattiva.it OR site:curia.europa.eu");
/// ```
pub fn site_restricted_query(query: &str, domains: &[&str]) -> String {
    let sites = domains
        .iter()
        .map(|d| format!("site:{}", d))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("{} {}", query.trim(), sites)
}
