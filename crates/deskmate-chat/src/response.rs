//! Response templates.
//!
//! Every answer category the assistant knows is a [`ResponseKind`] variant
//! rendered by [`ResponseKind::render`]. The system instruction embeds the
//! same templates rendered with bracketed placeholders, so the wording the
//! model is taught and the wording produced locally cannot drift apart.

use deskmate_tools::{DirectoryCandidate, EntityCandidate, Responsible};

/// A labelled phone number or e-mail address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactLine {
    pub label: String,
    pub value: String,
}

/// Postal address pieces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressLines {
    pub street: String,
    pub district: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

/// Answer categories and their typed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseKind {
    Capabilities {
        assistant: String,
        organization: String,
    },
    MultipleCompanies(Vec<EntityCandidate>),
    MultiplePeople(Vec<DirectoryCandidate>),
    TaxId {
        company: String,
        tax_id: String,
    },
    Responsibles {
        company: String,
        people: Vec<Responsible>,
    },
    Extension(DirectoryCandidate),
    Address {
        company: String,
        address: AddressLines,
    },
    TaxRegime {
        company: String,
        regime: String,
    },
    Contacts {
        company: String,
        phones: Vec<ContactLine>,
        emails: Vec<ContactLine>,
    },
    NoCompanyFound,
    InvalidSelection,
    ProcessingError,
}

impl ResponseKind {
    pub fn render(&self) -> String {
        match self {
            ResponseKind::Capabilities {
                assistant,
                organization,
            } => format!(
                "Olá! 👋 Sou {assistant}, seu assistente da {organization}. Posso ajudar você com diversas informações, como:<br><br>\
                 • Buscar informações sobre empresas clientes (responsáveis, tributação, endereço, contatos).<br>\
                 • Consultar ramais de funcionários.<br>\
                 • Acessar a história resumida da {organization}.<br><br>\
                 Basta me perguntar! 😊"
            ),
            ResponseKind::MultipleCompanies(companies) => {
                let lines: Vec<String> = companies
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("{}. <b>{}</b> (CNPJ: {})", i + 1, c.name, c.tax_id))
                    .collect();
                format!(
                    "🤔 Encontrei estas empresas. Qual delas você deseja consultar?<br>{}",
                    lines.join("<br>")
                )
            }
            ResponseKind::MultiplePeople(people) => {
                let lines: Vec<String> = people
                    .iter()
                    .enumerate()
                    .map(|(i, p)| format!("{}. <b>{}</b> ({})", i + 1, p.name, p.department))
                    .collect();
                format!(
                    "🤔 Encontrei mais de uma pessoa com este nome. Qual delas você se refere?<br>{}",
                    lines.join("<br>")
                )
            }
            ResponseKind::TaxId { company, tax_id } => {
                format!("✅ O CNPJ da <b>{company}</b> é <b>{tax_id}</b>.")
            }
            ResponseKind::Responsibles { company, people } => {
                let lines: Vec<String> = people
                    .iter()
                    .map(|p| format!("• {} <b>{}</b> ({})", position_icon(&p.position), p.name, p.position))
                    .collect();
                format!(
                    "✅ Os responsáveis por <b>{company}</b> são:<br><br>{}",
                    lines.join("<br>")
                )
            }
            ResponseKind::Extension(person) => format!(
                "📞 O ramal de <b>{}</b> ({}) é o <b>{}</b>.",
                person.name, person.department, person.extension
            ),
            ResponseKind::Address { company, address } => format!(
                "📍 O endereço de <b>{company}</b> é:<br><br>{}<br>{} - {}/{}<br>CEP: {}",
                address.street, address.district, address.city, address.state, address.postal_code
            ),
            ResponseKind::TaxRegime { company, regime } => {
                format!("🏢 O regime de <b>{company}</b> é:&nbsp;<b>{regime}</b>.")
            }
            ResponseKind::Contacts {
                company,
                phones,
                emails,
            } => format!(
                "📞 Os contatos para <b>{company}</b> são:<br><br><b>Telefones:</b><br>{}<br><br><b>Emails:</b><br>{}",
                contact_lines(phones),
                contact_lines(emails)
            ),
            ResponseKind::NoCompanyFound => {
                "Não encontrei nenhuma empresa com este nome. Verifique a grafia e tente novamente."
                    .to_string()
            }
            ResponseKind::InvalidSelection => {
                "Seleção inválida. Por favor, tente a busca novamente.".to_string()
            }
            ResponseKind::ProcessingError => {
                "Ocorreu um erro ao processar sua solicitação. Tente novamente.".to_string()
            }
        }
    }
}

fn contact_lines(lines: &[ContactLine]) -> String {
    lines
        .iter()
        .map(|l| format!("• {}:&nbsp;{}", l.label, l.value))
        .collect::<Vec<_>>()
        .join("<br>")
}

fn position_icon(position: &str) -> &'static str {
    let lowered = deskmate_core::text::normalize(position);
    if lowered.contains("fiscal") {
        "🧾"
    } else if lowered.contains("contab") {
        "💹"
    } else if lowered.contains("dp") || lowered.contains("pessoal") {
        "👥"
    } else {
        "👤"
    }
}
