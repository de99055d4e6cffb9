//! Tool boundary: JSON arguments in, JSON value out.
//!
//! Transport wiring (stdio JSON-RPC, tool registration with an agent
//! runtime) lives outside this crate; a host only needs [`ToolRegistry`].

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::aggregate::LiteratureSearcher;
use crate::models::SearchRequest;

/// A tool that can be called by a client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "search_literature")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: Value,

    /// Handler executing the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, String>;
}

/// Handler for `search_literature`
#[derive(Debug, Clone)]
pub struct SearchLiteratureHandler {
    pub searcher: Arc<LiteratureSearcher>,
}

impl SearchLiteratureHandler {
    pub fn new(searcher: Arc<LiteratureSearcher>) -> Self {
        Self { searcher }
    }

    /// Parse tool arguments into a request. `query` is required and every
    /// result cap must be positive.
    pub fn parse_request(args: Value) -> Result<SearchRequest, String> {
        if args.get("query").and_then(Value::as_str).is_none() {
            return Err("Missing 'query' parameter".to_string());
        }
        let request: SearchRequest =
            serde_json::from_value(args).map_err(|e| format!("Invalid arguments: {}", e))?;

        if request.max_results_per_db == 0 {
            return Err("'max_results_per_db' must be a positive integer".to_string());
        }
        if let Some((name, _)) = request
            .max_results_by_db
            .iter()
            .flatten()
            .find(|(_, max)| **max == 0)
        {
            return Err(format!(
                "'max_results_by_db.{}' must be a positive integer",
                name
            ));
        }
        Ok(request)
    }
}

#[async_trait::async_trait]
impl ToolHandler for SearchLiteratureHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let request = Self::parse_request(args)?;
        let output = self.searcher.search_literature(&request).await;
        serde_json::to_value(output).map_err(|e| e.to_string())
    }
}

/// Registry of the exposed tools
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Register every tool backed by `searcher`
    pub fn new(searcher: Arc<LiteratureSearcher>) -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        registry.register(Tool {
            name: "search_literature".to_string(),
            description: "Search medical literature across PubMed, PMC and KoreaMed. \
                          The query is sent to each search engine exactly as written."
                .to_string(),
            input_schema: search_literature_schema(),
            handler: Arc::new(SearchLiteratureHandler::new(searcher)),
        });

        registry
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// All registered tools
    pub fn all(&self) -> Vec<&Tool> {
        self.tools.values().collect()
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, String> {
        let tool = self
            .get(name)
            .ok_or_else(|| format!("Tool '{}' not found", name))?;
        tool.handler.execute(args).await
    }
}

fn search_literature_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Search query, used exactly as written"
            },
            "databases": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Databases to search: pubmed, pmc, koreamed (default: all)"
            },
            "max_results_per_db": {
                "type": "integer",
                "description": "Maximum results per database",
                "default": 20,
                "minimum": 1
            },
            "max_results_by_db": {
                "type": "object",
                "additionalProperties": { "type": "integer", "minimum": 1 },
                "description": "Per-database limits, e.g. {\"pubmed\": 20, \"pmc\": 15}"
            },
            "return_format": {
                "type": "string",
                "enum": ["compact", "detailed", "raw", "json"],
                "default": "compact"
            }
        },
        "required": ["query"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleSource, Backend, ReturnFormat};
    use crate::sources::mock::make_article;
    use crate::sources::{MockSource, Source};
    use std::time::Duration;

    fn registry() -> ToolRegistry {
        let sources: Vec<Arc<dyn Source>> = vec![Arc::new(
            MockSource::new(Backend::PubMed).with_articles(vec![make_article(
                "PMID:7",
                "Pulmonary sarcoidosis",
                ArticleSource::PubMed,
            )]),
        )];
        let searcher = LiteratureSearcher::with_sources(sources, Duration::ZERO);
        ToolRegistry::new(Arc::new(searcher))
    }

    #[test]
    fn test_parse_request() {
        let request = SearchLiteratureHandler::parse_request(json!({
            "query": "sarcoidosis",
            "databases": ["pubmed"],
            "max_results_by_db": {"pubmed": 5},
            "publication_types": ["Case Reports"],
            "return_format": "json"
        }))
        .unwrap();

        assert_eq!(request.query, "sarcoidosis");
        assert_eq!(request.max_results_for_db("pubmed"), 5);
        assert_eq!(request.return_format, ReturnFormat::Raw);
    }

    #[test]
    fn test_parse_request_errors() {
        assert_eq!(
            SearchLiteratureHandler::parse_request(json!({"databases": ["pubmed"]})).unwrap_err(),
            "Missing 'query' parameter"
        );
        assert!(SearchLiteratureHandler::parse_request(json!({
            "query": "q",
            "max_results_per_db": "many"
        }))
        .is_err());
    }

    #[test]
    fn test_parse_request_rejects_zero_caps() {
        assert_eq!(
            SearchLiteratureHandler::parse_request(json!({"query": "q", "max_results_per_db": 0}))
                .unwrap_err(),
            "'max_results_per_db' must be a positive integer"
        );
        let err = SearchLiteratureHandler::parse_request(json!({
            "query": "q",
            "max_results_by_db": {"pmc": 0}
        }))
        .unwrap_err();
        assert!(err.contains("max_results_by_db.pmc"));
    }

    #[tokio::test]
    async fn test_execute_search_literature() {
        let value = registry()
            .execute("search_literature", json!({"query": "sarcoidosis", "databases": ["pubmed"]}))
            .await
            .unwrap();

        assert_eq!(value["success"], true);
        assert_eq!(value["format"], "compact");
        assert_eq!(value["statistics"]["total_results"], 1);
        assert!(value["content"]
            .as_str()
            .unwrap()
            .contains("[PMID:7](https://example.com/PMID:7)"));
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let result = registry().execute("get_query_examples", json!({})).await;
        assert!(result.unwrap_err().contains("not found"));
    }
}
