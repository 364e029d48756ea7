//! Internal staff directory: departments, teams sharing an extension, and
//! the people in them.

use serde_json::Value;

use deskmate_core::text::{normalize, title_case};

use crate::types::DirectoryCandidate;

const DEFAULT_EXTENSION: &str = "N/A";
const DEFAULT_ICON: &str = "🏢";

/// Reply when the knowledge base has no directory.
pub const NO_DIRECTORY_MESSAGE: &str = "Não encontrei informações sobre os departamentos.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub extension: Option<String>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Department {
    pub name: String,
    pub teams: Vec<Team>,
}

/// Parsed `departments` knowledge entry, in stored order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    pub departments: Vec<Department>,
}

impl Directory {
    /// Parse `{department: [{ramal, equipe: [{nome, apelidos}]}]}`.
    ///
    /// Malformed parts are skipped rather than rejected; extensions may be
    /// strings or numbers.
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::default();
        };

        let departments = map
            .iter()
            .map(|(name, teams)| Department {
                name: name.clone(),
                teams: teams
                    .as_array()
                    .map(|teams| teams.iter().map(parse_team).collect())
                    .unwrap_or_default(),
            })
            .collect();

        Self { departments }
    }

    pub fn is_empty(&self) -> bool {
        self.departments.is_empty()
    }

    /// Everyone whose normalized name contains the normalized query, or who
    /// has an alias equal to it. Results follow directory order. A blank
    /// query matches every member; the tool layer rejects blank names.
    pub fn find_by_name(&self, query: &str) -> Vec<DirectoryCandidate> {
        let needle = normalize(query.trim());

        let mut matches = Vec::new();
        for department in &self.departments {
            for team in &department.teams {
                for member in &team.members {
                    let in_name = normalize(&member.name).contains(&needle);
                    let in_alias = member.aliases.iter().any(|a| normalize(a) == needle);
                    if in_name || in_alias {
                        matches.push(DirectoryCandidate {
                            name: member.name.clone(),
                            department: title_case(&department.name),
                            extension: team
                                .extension
                                .clone()
                                .unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
                        });
                    }
                }
            }
        }
        matches
    }

    /// HTML listing of every department and extension.
    pub fn format_listing(&self) -> String {
        if self.is_empty() {
            return NO_DIRECTORY_MESSAGE.to_string();
        }

        let mut html = String::from("Aqui está a lista de ramais e equipes:<br><pre>");
        for department in &self.departments {
            html.push_str(&format!(
                "{} <b>{}</b>\n",
                department_icon(&department.name),
                department.name.to_uppercase()
            ));
            for team in &department.teams {
                let members: Vec<&str> = team.members.iter().map(|m| m.name.as_str()).collect();
                html.push_str(&format!(
                    "  <b>Ramal {}</b>: {}\n",
                    team.extension.as_deref().unwrap_or(DEFAULT_EXTENSION),
                    members.join(" • ")
                ));
            }
            html.push('\n');
        }
        html.push_str("</pre>");
        html
    }
}

fn department_icon(name: &str) -> &'static str {
    match name.to_lowercase().as_str() {
        "diretoria" => "👑",
        "dp" => "👥",
        "fiscal" => "🧾",
        "contábil" => "💹",
        "administrativo" => "📁",
        "ti" => "💻",
        "financeiro" => "💰",
        "comercial" => "📈",
        "recepção" => "👋",
        "rh" => "👩‍💼",
        "irpf" => "📄",
        _ => DEFAULT_ICON,
    }
}

fn parse_team(raw: &Value) -> Team {
    let extension = match raw.get("ramal") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    let members = raw
        .get("equipe")
        .and_then(Value::as_array)
        .map(|members| members.iter().filter_map(parse_member).collect())
        .unwrap_or_default();
    Team { extension, members }
}

fn parse_member(raw: &Value) -> Option<Member> {
    let name = raw.get("nome")?.as_str()?.to_string();
    let aliases = raw
        .get("apelidos")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    Some(Member { name, aliases })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Directory {
        Directory::from_value(&json!({
            "TI": [
                {"ramal": "210", "equipe": [
                    {"nome": "Ana Souza", "apelidos": ["Aninha"]},
                    {"nome": "Carlos Lima", "apelidos": []}
                ]}
            ],
            "fiscal": [
                {"ramal": 220, "equipe": [{"nome": "Ana Paula Reis", "apelidos": ["Paulinha"]}]},
                {"equipe": [{"nome": "Jéssica Araújo"}]}
            ],
            "recepção": []
        }))
    }

    #[test]
    fn test_find_by_alias() {
        let found = sample().find_by_name("aninha");
        assert_eq!(
            found,
            vec![DirectoryCandidate {
                name: "Ana Souza".into(),
                department: "Ti".into(),
                extension: "210".into(),
            }]
        );
    }

    #[test]
    fn test_alias_requires_exact_match() {
        assert!(sample().find_by_name("aninh").is_empty());
    }

    #[test]
    fn test_find_by_name_substring_in_order() {
        let found = sample().find_by_name("ANA");
        let names: Vec<&str> = found.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ana Souza", "Ana Paula Reis"]);
        assert_eq!(found[1].department, "Fiscal");
        assert_eq!(found[1].extension, "220");
    }

    #[test]
    fn test_find_ignores_accents_and_defaults_extension() {
        let found = sample().find_by_name("jessica araujo");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].extension, "N/A");
    }

    #[test]
    fn test_find_is_idempotent() {
        let dir = sample();
        assert_eq!(dir.find_by_name("ana"), dir.find_by_name("ana"));
    }

    #[test]
    fn test_blank_query_matches_every_member() {
        let found = sample().find_by_name("   ");
        let names: Vec<&str> = found.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Ana Souza", "Carlos Lima", "Ana Paula Reis", "Jéssica Araújo"]
        );
    }

    #[test]
    fn test_format_listing() {
        let html = sample().format_listing();
        assert!(html.starts_with("Aqui está a lista de ramais e equipes:<br><pre>"));
        assert!(html.contains("💻 <b>TI</b>\n"));
        assert!(html.contains("  <b>Ramal 210</b>: Ana Souza • Carlos Lima\n"));
        assert!(html.contains("🧾 <b>FISCAL</b>\n"));
        assert!(html.contains("  <b>Ramal N/A</b>: Jéssica Araújo\n"));
        assert!(html.contains("👋 <b>RECEPÇÃO</b>\n"));
        assert!(html.ends_with("</pre>"));
        let ti = html.find("<b>TI</b>").unwrap();
        let fiscal = html.find("<b>FISCAL</b>").unwrap();
        assert!(ti < fiscal);
    }

    #[test]
    fn test_format_listing_empty() {
        assert_eq!(Directory::default().format_listing(), NO_DIRECTORY_MESSAGE);
    }

    #[test]
    fn test_unknown_department_icon() {
        assert_eq!(department_icon("Jurídico"), "🏢");
        assert_eq!(department_icon("TI"), "💻");
    }
}
