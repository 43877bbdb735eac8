//! Study-file tools: list, read, and search the student's file library.
//!
//! Backed by a mock catalog standing in for a real file store; each handler
//! simulates the latency of the backing store it mocks.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Tool, ToolError};

struct MockFile {
    id: u64,
    name: &'static str,
    content: &'static str,
}

static MOCK_FILES: &[MockFile] = &[
    MockFile {
        id: 1,
        name: "Biology_Chapter_5.pdf",
        content: "This is the content of the biology chapter 5 PDF file. It contains information about photosynthesis and cellular respiration.",
    },
    MockFile {
        id: 2,
        name: "History_Notes.txt",
        content: "These are history notes covering World War I and II, including key dates, figures, and events.",
    },
    MockFile {
        id: 3,
        name: "Chemistry_Formulas.pdf",
        content: "This PDF contains important chemistry formulas and equations for organic and inorganic chemistry.",
    },
    MockFile {
        id: 4,
        name: "Literature_Analysis.pdf",
        content: "Literary analysis of Shakespeare's Hamlet, including themes, characters, and plot summary.",
    },
    MockFile {
        id: 5,
        name: "Physics_Problems.txt",
        content: "Collection of physics problems and solutions covering mechanics, thermodynamics, and electromagnetism.",
    },
    MockFile {
        id: 6,
        name: "Math_Equations.pdf",
        content: "Comprehensive guide to mathematical equations including algebra, calculus, and geometry formulas.",
    },
    MockFile {
        id: 7,
        name: "Geography_Maps.pdf",
        content: "Geographical maps and information about world continents, countries, and major cities.",
    },
    MockFile {
        id: 8,
        name: "Economics_Study_Guide.txt",
        content: "Economics study guide covering supply and demand, market structures, and economic indicators.",
    },
];

/// Get the content of a file by its ID.
pub struct GetFileContent;

#[async_trait]
impl Tool for GetFileContent {
    fn name(&self) -> &str {
        "getFileContent"
    }

    fn description(&self) -> &str {
        "Get the content of a specific file by its ID"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "fileId": {
                    "type": "number",
                    "description": "The ID of the file to retrieve content for."
                }
            },
            "required": ["fileId"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let file_id = args["fileId"]
            .as_u64()
            .ok_or_else(|| ToolError::new(self.name(), "missing 'fileId' argument"))?;

        tokio::time::sleep(Duration::from_millis(1000)).await;

        let file = MOCK_FILES
            .iter()
            .find(|file| file.id == file_id)
            .ok_or_else(|| ToolError::new(self.name(), format!("file {} not found", file_id)))?;

        Ok(json!({ "content": file.content }))
    }
}

/// List all available files.
pub struct ListFiles;

#[async_trait]
impl Tool for ListFiles {
    fn name(&self) -> &str {
        "listFiles"
    }

    fn description(&self) -> &str {
        "List all available files with their IDs and names"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        tokio::time::sleep(Duration::from_millis(500)).await;

        let files: Vec<Value> = MOCK_FILES
            .iter()
            .map(|file| json!({ "id": file.id, "name": file.name }))
            .collect();

        Ok(json!({ "files": files }))
    }
}

/// Search for a query across all files.
pub struct SearchInFiles;

#[async_trait]
impl Tool for SearchInFiles {
    fn name(&self) -> &str {
        "searchInFiles"
    }

    fn description(&self) -> &str {
        "Search for a query across all files and return relevant excerpts"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query to look for in files."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| ToolError::new(self.name(), "missing 'query' argument"))?;

        tokio::time::sleep(Duration::from_millis(1500)).await;

        let needle = query.to_lowercase();
        let results: Vec<Value> = MOCK_FILES
            .iter()
            .filter(|file| file.content.to_lowercase().contains(&needle))
            .map(|file| {
                json!({
                    "id": file.id,
                    "name": file.name,
                    "excerpt": excerpt(file.content),
                })
            })
            .collect();

        Ok(json!({ "results": results }))
    }
}

fn excerpt(content: &str) -> String {
    let head: String = content.chars().take(100).collect();
    format!("{}...", head)
}
