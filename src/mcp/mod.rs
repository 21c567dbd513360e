//! MCP (Model Context Protocol) tools for precedent research
//!
//! One tool per court. Each call runs on a fresh page of the shared browser, on a blocking
//! thread, under the configured wall-clock ceiling.

pub mod handler;
pub use handler::LegalResearchServer;

use crate::browser::BrowserSession;
use crate::courts::Court;
use crate::error::ResearchError;
use crate::research::Query;
use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content},
    tool, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_page() -> i64 {
    1
}

/// Requisição dos precedentes judiciais do Superior Tribunal de Justiça (STJ)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StjResearchParams {
    /// Critérios que serão buscados na ementa das decisões desejadas.
    ///
    /// Na ausência de operador explícito entre duas palavras, presume-se `e`. Operadores lógicos:
    /// `e`, `ou` (termos entre parênteses), `não`, `mesmo` (mesmo campo), `com` (mesmo parágrafo).
    /// Proximidade: `prox(N)` em qualquer ordem, `adj(N)` na ordem dada. Símbolos: `$` substitui
    /// vários caracteres, `?` substitui um caractere, `( )` agrupa, `" "` busca a expressão exata.
    ///
    /// Exemplos: `supermercado e furto e veículo`, `(carro ou automóvel ou veículo)`,
    /// `nega prox2 provimento prox5 recursos`, `causa adj3 aumento adj2 pena`.
    #[schemars(length(min = 1))]
    pub summary: String,

    /// A página dos resultados a ser retornada. A página 1 é a primeira.
    ///
    /// Se os resultados da página anterior forem pertinentes, mas não satisfatórios, requisite a
    /// página seguinte para obter mais precedentes relacionados.
    #[serde(default = "default_page")]
    #[schemars(range(min = 1))]
    pub page: i64,
}

/// Requisição dos precedentes judiciais do Tribunal Superior do Trabalho (TST)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TstResearchParams {
    /// Critérios que serão buscados na ementa das decisões desejadas.
    ///
    /// É admitido o uso de aspas, que devem ser empregadas para pesquisas exatas de expressões ou
    /// palavras compostas. Exemplo: `trabalho temporário jornada "adicional de periculosidade"`.
    #[schemars(length(min = 1))]
    pub summary: String,

    /// A página dos resultados a ser retornada. A página 1 é a primeira.
    #[serde(default = "default_page")]
    #[schemars(range(min = 1))]
    pub page: i64,
}

/// Requisição dos precedentes judiciais do Supremo Tribunal Federal (STF)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StfResearchParams {
    /// Critérios que serão buscados na ementa das decisões desejadas.
    ///
    /// Na ausência de operador explícito entre duas palavras, presume-se `E`. Operadores: `E`,
    /// `OU`, `NÃO`, `" "` (ordem e grafia exatas), `"termo1 termo2"~N` (no máximo N palavras entre
    /// os termos, em qualquer ordem), `termo~` (pequenas variações do termo), `$` (nenhum, um ou
    /// mais caracteres), `?` (um único caractere), `( )` (prioridade).
    ///
    /// Exemplos: `direito E (privacidade OU intimidade)`, `"provimento cargo"~5`, `RE 56394?`.
    #[schemars(length(min = 1))]
    pub summary: String,

    /// A página dos resultados a ser retornada. Cada página traz até 10 precedentes.
    #[serde(default = "default_page")]
    #[schemars(range(min = 1))]
    pub page: i64,
}

/// Map a research failure onto the protocol's error codes
pub fn to_mcp_error(error: ResearchError) -> McpError {
    let message = error.to_string();
    match error {
        ResearchError::Validation(_) => McpError::invalid_params(message, None),
        ResearchError::ServiceMalfunction {
            court, diagnostics, ..
        } => McpError::internal_error(
            message,
            Some(serde_json::json!({
                "court": court,
                "url": diagnostics.url,
                "status": diagnostics.status,
            })),
        ),
        ResearchError::PageOutOfRange {
            court,
            requested,
            available,
        } => McpError::internal_error(
            message,
            Some(serde_json::json!({
                "court": court,
                "requested": requested,
                "available": available,
            })),
        ),
        ResearchError::InvalidRecord { court, .. } => {
            McpError::internal_error(message, Some(serde_json::json!({ "court": court })))
        }
    }
}

/// Check the request before any browser work
fn validate(summary: &str, page: i64) -> Result<Query, McpError> {
    let page_number = u32::try_from(page)
        .map_err(|_| McpError::invalid_params(format!("Invalid request: page {} is out of range", page), None))?;
    Query::new(summary, page_number).map_err(to_mcp_error)
}

#[tool_router]
impl LegalResearchServer {
    #[tool(
        description = "Pesquisa precedentes judiciais do Superior Tribunal de Justiça (STJ), instância máxima da justiça brasileira no âmbito infraconstitucional, responsável por uniformizar a interpretação da lei federal. Retorna as ementas da página de resultados pedida."
    )]
    async fn stj_legal_precedents(
        &self,
        Parameters(params): Parameters<StjResearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = validate(&params.summary, params.page)?;
        self.run(Court::Stj, query).await
    }

    #[tool(
        description = "Pesquisa precedentes judiciais do Tribunal Superior do Trabalho (TST), órgão de cúpula da Justiça do Trabalho, que uniformiza a jurisprudência trabalhista brasileira. Retorna as ementas da página de resultados pedida."
    )]
    async fn tst_legal_precedents(
        &self,
        Parameters(params): Parameters<TstResearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = validate(&params.summary, params.page)?;
        self.run(Court::Tst, query).await
    }

    #[tool(
        description = "Pesquisa precedentes judiciais do Supremo Tribunal Federal (STF), órgão máximo do Poder Judiciário brasileiro e guardião da Constituição Federal. Retorna as ementas da página de resultados pedida."
    )]
    async fn stf_legal_precedents(
        &self,
        Parameters(params): Parameters<StfResearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = validate(&params.summary, params.page)?;
        self.run(Court::Stf, query).await
    }
}

impl LegalResearchServer {
    /// Research on a fresh page, closing it afterwards whatever happens
    async fn run(&self, court: Court, query: Query) -> Result<CallToolResult, McpError> {
        log::info!(
            court = court.code(),
            page = query.page_number();
            "Received tool call"
        );

        let config = self.researcher().config().clone();
        let session = self.session();
        let page = tokio::task::spawn_blocking(move || {
            session
                .open_page()
                .map(|page| page.network_idle_quiet(config.network_idle_quiet))
        })
        .await
        .map_err(|e| McpError::internal_error(format!("page task failed: {}", e), None))?
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        let tab = page.tab().clone();
        let researcher = self.researcher().clone();
        let call_timeout = researcher.config().call_timeout;

        let work = tokio::task::spawn_blocking(move || {
            let findings = researcher.research(&page, court, query.search_text(), query.page_number());
            if let Err(e) = BrowserSession::close_page(page.tab()) {
                log::debug!("Ignoring failure to close research page: {}", e);
            }
            findings
        });

        let findings = match tokio::time::timeout(call_timeout, work).await {
            Ok(joined) => joined
                .map_err(|e| McpError::internal_error(format!("research task failed: {}", e), None))?
                .map_err(to_mcp_error)?,
            Err(_) => {
                log::warn!(
                    court = court.code();
                    "Research exceeded {:?}, closing its page",
                    call_timeout
                );
                // The blocked research thread fails fast once its tab is gone
                if let Ok(Err(e)) = tokio::task::spawn_blocking(move || BrowserSession::close_page(&tab)).await {
                    log::debug!("Ignoring failure to close timed out page: {}", e);
                }
                return Err(McpError::internal_error(
                    format!("{} research exceeded {} seconds", court, call_timeout.as_secs()),
                    None,
                ));
            }
        };

        let texts = findings
            .into_texts()
            .map_err(|e| McpError::internal_error(format!("Failed to serialize precedents: {}", e), None))?;

        Ok(CallToolResult::success(texts.into_iter().map(Content::text).collect()))
    }
}
