use crate::browser::{BrowserSession, ConnectionOptions, LaunchOptions};
use crate::research::{ResearchConfig, Researcher};
use rmcp::{
    ServerHandler,
    handler::server::router::tool::ToolRouter,
    model::{Implementation, ServerCapabilities, ServerInfo},
    tool_handler,
};
use std::sync::Arc;

/// MCP server for precedent research on the Brazilian superior courts
///
/// Clones share one browser; every tool call opens and closes its own page in it.
#[derive(Clone)]
pub struct LegalResearchServer {
    tool_router: ToolRouter<Self>,
    session: Arc<BrowserSession>,
    researcher: Researcher,
}

impl LegalResearchServer {
    /// Serve research over an existing browser session
    pub fn new(session: BrowserSession, config: ResearchConfig) -> Self {
        Self::with_shared_session(Arc::new(session), config)
    }

    /// Serve research over a session already shared with other servers
    pub fn with_shared_session(session: Arc<BrowserSession>, config: ResearchConfig) -> Self {
        Self {
            tool_router: Self::tool_router(),
            session,
            researcher: Researcher::new(config),
        }
    }

    /// Launch a browser and serve research over it
    pub fn with_options(options: LaunchOptions, config: ResearchConfig) -> crate::error::Result<Self> {
        Ok(Self::new(BrowserSession::launch(options)?, config))
    }

    /// Attach to a running browser and serve research over it
    pub fn connect(options: ConnectionOptions, config: ResearchConfig) -> crate::error::Result<Self> {
        Ok(Self::new(BrowserSession::connect(options)?, config))
    }

    pub fn session(&self) -> Arc<BrowserSession> {
        Arc::clone(&self.session)
    }

    pub fn researcher(&self) -> &Researcher {
        &self.researcher
    }
}

#[tool_handler]
impl ServerHandler for LegalResearchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Pesquisa de precedentes judiciais (ementas) no STJ, no TST e no STF. Cada ferramenta \
                 recebe os critérios de busca da ementa e a página de resultados desejada e retorna \
                 um precedente por conteúdo, ou a mensagem \"Nenhum resultado encontrado\"."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            ..Default::default()
        }
    }
}
