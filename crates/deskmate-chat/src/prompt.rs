//! System instruction that opens every session history.

use deskmate_tools::builtin::{FIND_EXTENSION, GET_HISTORY, SEARCH_CLIENTS};
use deskmate_tools::{DirectoryCandidate, EntityCandidate, Responsible};

use crate::response::{AddressLines, ContactLine, ResponseKind};
use crate::types::Turn;

/// Fixed model acknowledgment that follows the system instruction.
pub const ACKNOWLEDGMENT: &str = "Entendido. Seguirei as instruções e fluxos de ação rigorosamente.";

/// The first two history turns: the instruction and its acknowledgment.
pub fn initial_history(assistant: &str, organization: &str) -> Vec<Turn> {
    vec![
        Turn::user(system_instruction(assistant, organization)),
        Turn::model(ACKNOWLEDGMENT),
    ]
}

pub fn system_instruction(assistant: &str, organization: &str) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "**CONTEXTO OPERACIONAL:** Você é {assistant}, uma ferramenta interna da {organization}. \
         Suas ferramentas são APIs internas autorizadas. Você TEM PERMISSÃO para acessar e fornecer \
         as informações retornadas por estas ferramentas. NUNCA negue um pedido alegando falta de \
         acesso ou confidencialidade se uma ferramenta existir. Se a ferramenta não retornar dados, \
         informe que a informação não está disponível.\n\n"
    ));

    out.push_str(
        "**REGRAS DE FORMATAÇÃO:**\n\
         - Use APENAS HTML (`<b>`, `<br>`) e emojis. É PROIBIDO usar markdown (`**`, `*`).\n\
         - Para listas não-numeradas, use o emoji \"•\".\n\
         - NUNCA adicione itens vazios ou inventados a uma lista de resultados.\n\n",
    );

    out.push_str("**FLUXOS DE AÇÃO:**\n");
    out.push_str(&format!(
        "1. **Consulta de Empresas:**\n\
         - Para qualquer pergunta sobre uma empresa, use `{SEARCH_CLIENTS}`.\n\
         - Se a ferramenta retornar uma lista vazia, responda: \"{}\".\n\
         - Se retornar múltiplos resultados, apresente as opções numeradas.\n\
         - Quando o usuário responder com um número, a sua próxima ação DEVE ser sobre a empresa escolhida.\n",
        ResponseKind::NoCompanyFound.render()
    ));
    out.push_str(&format!(
        "2. **Consulta de Ramais:**\n\
         - Para perguntas sobre ramais, use `{FIND_EXTENSION}`.\n\
         - Se a ferramenta retornar múltiplos resultados, apresente a lista numerada com APENAS o nome e o departamento. NÃO inclua o ramal.\n\
         - Quando o usuário responder com um número, use a informação da pessoa escolhida para formatar a resposta final.\n"
    ));
    out.push_str(&format!(
        "3. **Perguntas Gerais:**\n\
         - Se perguntarem sobre a história da {organization}, chame `{GET_HISTORY}` e exiba o resultado.\n\
         - Se perguntarem \"o que você pode fazer\", use o modelo de resposta exato para essa pergunta.\n\n"
    ));

    out.push_str("**MODELOS DE RESPOSTA:**\n");
    for (label, kind) in placeholder_templates(assistant, organization) {
        out.push_str(&format!("- **{label}:** \"{}\"\n", kind.render()));
    }
    out
}

fn placeholder(name: &str) -> String {
    format!("[{name}]")
}

/// Every answer template, filled with bracketed placeholders.
fn placeholder_templates(assistant: &str, organization: &str) -> Vec<(&'static str, ResponseKind)> {
    let company = placeholder("Empresa");
    let person = |position: &str| Responsible {
        name: placeholder("Nome"),
        position: position.to_string(),
    };

    vec![
        (
            "\"O que você pode fazer?\"",
            ResponseKind::Capabilities {
                assistant: assistant.to_string(),
                organization: organization.to_string(),
            },
        ),
        (
            "Múltiplas Empresas",
            ResponseKind::MultipleCompanies(vec![EntityCandidate {
                id: 0,
                name: placeholder("Razão Social"),
                tax_id: placeholder("CNPJ"),
            }]),
        ),
        (
            "Múltiplas Pessoas",
            ResponseKind::MultiplePeople(vec![DirectoryCandidate {
                name: placeholder("Nome"),
                department: placeholder("Depto"),
                extension: placeholder("Ramal"),
            }]),
        ),
        (
            "CNPJ",
            ResponseKind::TaxId {
                company: placeholder("Razão Social Completa"),
                tax_id: placeholder("CNPJ Formatado"),
            },
        ),
        (
            "Responsáveis",
            ResponseKind::Responsibles {
                company: company.clone(),
                people: vec![person("Fiscal"), person("Contábil"), person("DP")],
            },
        ),
        (
            "Ramal",
            ResponseKind::Extension(DirectoryCandidate {
                name: placeholder("Nome"),
                department: placeholder("Depto"),
                extension: placeholder("Ramal"),
            }),
        ),
        (
            "Endereço",
            ResponseKind::Address {
                company: company.clone(),
                address: AddressLines {
                    street: placeholder("Rua"),
                    district: placeholder("Bairro"),
                    city: placeholder("Cidade"),
                    state: placeholder("Estado"),
                    postal_code: placeholder("CEP"),
                },
            },
        ),
        (
            "Tributação",
            ResponseKind::TaxRegime {
                company: company.clone(),
                regime: placeholder("Regime"),
            },
        ),
        (
            "Contatos",
            ResponseKind::Contacts {
                company,
                phones: vec![ContactLine {
                    label: placeholder("Nome"),
                    value: placeholder("Número"),
                }],
                emails: vec![ContactLine {
                    label: placeholder("Nome"),
                    value: placeholder("Email"),
                }],
            },
        ),
    ]
}
