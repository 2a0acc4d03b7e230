//! Canonicalizes free-text survey fields at ingestion time.
//!
//! Department, hostel, and POR strings arrive in whatever shape students
//! typed them. Everything downstream (matching, admin filters) compares
//! canonical values, so this module runs exactly once per raw field while
//! seeding and never at request time. Unmapped values pass through trimmed
//! rather than being discarded.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Which synonym table and pattern rules apply to a raw field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Department,
    Hostel,
    Por,
}

/// Canonicalize `raw` according to `kind`. Empty input yields an empty
/// string, never an error.
pub fn normalize(kind: FieldKind, raw: &str) -> String {
    match kind {
        FieldKind::Department => normalize_department(raw),
        FieldKind::Hostel => normalize_hostel(raw),
        FieldKind::Por => normalize_por(raw),
    }
}

pub fn normalize_department(raw: &str) -> String {
    let cleaned = clean(raw);
    if cleaned.is_empty() {
        return String::new();
    }

    match department_map().get(cleaned.to_lowercase().as_str()) {
        Some(canonical) => (*canonical).to_string(),
        None => cleaned,
    }
}

pub fn normalize_hostel(raw: &str) -> String {
    let cleaned = clean(raw);
    if cleaned.is_empty() {
        return String::new();
    }

    if cleaned.bytes().all(|b| b.is_ascii_digit()) {
        return format!("Hostel {cleaned}");
    }

    match hostel_number(&cleaned) {
        Some(number) => format!("Hostel {number}"),
        None => cleaned,
    }
}

pub fn normalize_por(raw: &str) -> String {
    let cleaned = clean(raw);
    if cleaned.is_empty() {
        return String::new();
    }
    // ASCII case-folding keeps byte offsets aligned with `cleaned` for the
    // prefix/suffix slicing below.
    let lower = cleaned.to_ascii_lowercase();

    if let Some(canonical) = por_map().get(lower.as_str()) {
        return (*canonical).to_string();
    }

    if let Some(base) = strip_role_suffix(&cleaned) {
        if let Some(canonical) = por_map().get(base.to_ascii_lowercase().as_str()) {
            return (*canonical).to_string();
        }
        return title_case(base);
    }

    if lower.contains("council") {
        if let Some(canonical) = council_map().get(lower.as_str()) {
            return (*canonical).to_string();
        }
        return cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    }

    if let Some(team) = lower.strip_prefix("team ") {
        if let Some(canonical) = por_map().get(team.trim()) {
            return (*canonical).to_string();
        }
        return cleaned[5..].trim().to_string();
    }

    cleaned
}

/// Strip the BOM/zero-width characters that survive spreadsheet exports,
/// then trim.
fn clean(raw: &str) -> String {
    raw.replace(['\u{feff}', '\u{200b}'], "").trim().to_string()
}

/// Extract a hostel number from variants like "H5", "h-5", "Hostel 5".
fn hostel_number(cleaned: &str) -> Option<String> {
    let lower = cleaned.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("hostel")
        .or_else(|| lower.strip_prefix('h'))?;
    let digits = rest.trim_start_matches([' ', '-', '\t']);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits.to_string())
}

/// Remove a trailing role word ("X Coordinator", "X Core Team", ...) and
/// return the base activity name, if any content precedes the role.
fn strip_role_suffix(cleaned: &str) -> Option<&str> {
    const SUFFIXES: [&str; 5] = [
        "overall coordinator",
        "coordinator",
        "core team",
        "manager",
        "head",
    ];

    let lower = cleaned.to_ascii_lowercase();
    for suffix in SUFFIXES {
        if let Some(prefix_len) = lower
            .strip_suffix(suffix)
            .filter(|base| base.ends_with(' '))
            .map(str::len)
        {
            let base = cleaned[..prefix_len].trim();
            if !base.is_empty() {
                return Some(base);
            }
        }
    }
    None
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn department_map() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            ("cs", "Computer Science"),
            ("cse", "Computer Science"),
            ("computer science", "Computer Science"),
            (
                "computer science & engineering",
                "Computer Science & Engineering",
            ),
            ("ee", "Electrical Engineering"),
            ("elec", "Electrical Engineering"),
            ("electrical", "Electrical Engineering"),
            ("electrical engineering", "Electrical Engineering"),
            ("me", "Mechanical Engineering"),
            ("mech", "Mechanical Engineering"),
            ("mechanical", "Mechanical Engineering"),
            ("mechanical engineering", "Mechanical Engineering"),
            ("meta", "Metallurgical Engineering"),
            ("metallurgical", "Metallurgical Engineering"),
            ("metallurgical engineering", "Metallurgical Engineering"),
            ("chem", "Chemical Engineering"),
            ("chemical", "Chemical Engineering"),
            ("chemical engineering", "Chemical Engineering"),
            ("civil", "Civil Engineering"),
            ("civil engineering", "Civil Engineering"),
            ("aero", "Aerospace Engineering"),
            ("aerospace", "Aerospace Engineering"),
            ("aerospace engineering", "Aerospace Engineering"),
            ("ep", "Engineering Physics"),
            ("engineering physics", "Engineering Physics"),
            ("eco", "Economics"),
            ("economics", "Economics"),
            ("energy", "Energy Science and Engineering"),
            ("energy science and engineering", "Energy Science and Engineering"),
            ("physics", "Physics"),
            ("mathematics", "Mathematics"),
            ("chemistry", "Chemistry"),
            (
                "environmental science and engineering",
                "Environmental Science and Engineering",
            ),
        ])
    })
}

fn por_map() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            ("smp", "SMP"),
            ("s.m.p", "SMP"),
            ("s.m.p.", "SMP"),
            ("wncc", "WnCC"),
            ("web and coding club", "WnCC"),
            ("web and coding club (wncc)", "WnCC"),
            ("techfest", "Techfest"),
            ("tech fest", "Techfest"),
            ("mood indigo", "Mood Indigo"),
            ("mood-indigo", "Mood Indigo"),
            ("mi", "Mood Indigo"),
            ("aavhan", "Aavhan"),
            ("e-cell", "E-Cell"),
            ("enactus", "Enactus"),
            ("sarc", "SARC"),
            ("saathi", "Saathi"),
            ("abhyuday", "Abhyuday"),
            ("mars rover team", "Mars Rover Team"),
            ("hyperloop iitb", "Hyperloop"),
            ("hyperloop", "Hyperloop"),
            ("iitb rocket team", "Rocket Team"),
            ("rocket team", "Rocket Team"),
            ("iitb-racing", "Racing Team"),
            ("racing team", "Racing Team"),
            ("student satellite team", "Student Satellite"),
            ("student satellite", "Student Satellite"),
            ("auv iitb", "AUV"),
            ("auv", "AUV"),
            ("institute sports", "Institute Sports"),
            ("nso", "NSO"),
            ("nss", "NSS"),
            ("ncc", "NCC"),
            ("frisbee", "Ultimate Frisbee"),
            ("ultimate frisbee", "Ultimate Frisbee"),
            ("calistanics", "Calisthenics"),
            ("calisthenics", "Calisthenics"),
            ("calisthenics club", "Calisthenics"),
            ("research", "Research"),
            ("casper research group", "Research"),
            ("hult prize", "Hult Prize"),
            ("spart", "SPART"),
            ("spart (solar powered airship research team)", "SPART"),
            ("gra", "GRA"),
            ("group for rural activities", "GRA"),
            ("sports head", "Sports Affairs Council"),
            ("team shunya", "Team Shunya"),
            ("team zero waste", "Sustainability Cell"),
            ("sustainability cell", "Sustainability Cell"),
            ("soc", "SoC"),
            ("sos", "SoS"),
            ("summer of science mentor", "SoS Mentor"),
            ("sos mentor", "SoS Mentor"),
            ("wids mentorship", "WiDS"),
            ("wids", "WiDS"),
            ("teaching assistant", "Teaching Assistant"),
        ])
    })
}

fn council_map() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            ("student council", "Student Council"),
            ("hostel council", "Hostel Affairs Council"),
            ("hostel affairs council", "Hostel Affairs Council"),
            ("sports council", "Sports Affairs Council"),
            ("sports affairs council", "Sports Affairs Council"),
            ("cultural council", "Cultural Affairs Council"),
            ("cultural affairs council", "Cultural Affairs Council"),
            ("academic council", "Academic Affairs Council"),
            ("academic affairs council", "Academic Affairs Council"),
            ("technical council", "Technical Affairs Council"),
            ("tech council", "Technical Affairs Council"),
            ("technical affairs council", "Technical Affairs Council"),
            ("department council", "Department Council"),
            (
                "environmental science & engineering council",
                "Environmental Engineering Council",
            ),
            (
                "environmental engineering council",
                "Environmental Engineering Council",
            ),
        ])
    })
}
