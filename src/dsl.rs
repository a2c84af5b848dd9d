use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::compiler::{BlockId, NodeGraph};
use crate::schema::{BlockRegistry, TAG_PREFIX};

pub const GRAPH_DSL_VERSION: &str = "1.0";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GraphDSL {
    pub version: String,
    pub metadata: Metadata,
    pub blocks: Vec<BlockRecord>,
    pub connections: Vec<Connection>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Metadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

/// One serialized block: identity fields plus the block's own scalar fields.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BlockRecord {
    pub id: String,
    #[serde(rename = "customType")]
    pub custom_type: String,
    pub name: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Connection {
    pub from: Endpoint,
    pub to: Endpoint,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Endpoint {
    #[serde(rename = "blockId")]
    pub block_id: String,
    pub port: String,
}

/// Context handed to block factories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeserializeContext {
    /// Root that relative resource names are resolved against.
    pub root_url: String,
}

impl DeserializeContext {
    pub fn new(root_url: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into(),
        }
    }

    pub fn resolve(&self, name: &str) -> String {
        if self.root_url.is_empty() || name.contains("://") || name.starts_with('/') {
            return name.to_string();
        }
        format!("{}/{}", self.root_url.trim_end_matches('/'), name)
    }
}

pub fn load_graph_from_path(path: impl AsRef<Path>) -> Result<GraphDSL> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read graph json at {}", path.display()))?;
    let graph: GraphDSL = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse graph json at {}", path.display()))?;
    Ok(graph)
}

/// Instantiates every block through `registry` and replays the connections.
pub fn graph_from_dsl(
    dsl: &GraphDSL,
    registry: &BlockRegistry,
    ctx: &DeserializeContext,
) -> Result<NodeGraph> {
    let mut graph = NodeGraph::new();
    let mut ids: HashMap<&str, BlockId> = HashMap::new();

    for record in &dsl.blocks {
        if ids.contains_key(record.id.as_str()) {
            bail!("duplicate block id: {}", record.id);
        }
        let block = registry
            .create(record, ctx)
            .with_context(|| format!("failed to create block `{}` ({})", record.name, record.id))?;
        let id = graph.add_boxed_block(record.name.clone(), block);
        ids.insert(record.id.as_str(), id);
    }

    for connection in &dsl.connections {
        let lookup = |endpoint: &Endpoint| {
            ids.get(endpoint.block_id.as_str())
                .copied()
                .ok_or_else(|| anyhow!("connection references unknown block {}", endpoint.block_id))
        };
        let from = lookup(&connection.from)?;
        let to = lookup(&connection.to)?;
        graph
            .connect_named(from, &connection.from.port, to, &connection.to.port)
            .with_context(|| {
                format!(
                    "failed to connect {}.{} -> {}.{}",
                    connection.from.block_id,
                    connection.from.port,
                    connection.to.block_id,
                    connection.to.port
                )
            })?;
    }

    Ok(graph)
}

fn record_id(id: BlockId) -> String {
    format!("b{}", id.index())
}

pub fn graph_to_dsl(graph: &NodeGraph, name: &str) -> Result<GraphDSL> {
    let mut blocks = Vec::with_capacity(graph.len());
    for id in graph.block_ids() {
        let block = graph.block(id)?;
        blocks.push(BlockRecord {
            id: record_id(id),
            custom_type: format!("{TAG_PREFIX}{}", block.class_name()),
            name: graph.name(id)?.to_string(),
            params: block.serialize_fields(),
        });
    }

    let mut connections = Vec::with_capacity(graph.links().len());
    for link in graph.links() {
        let from_port = graph
            .outputs(link.from.block)?
            .get(link.from.port)
            .ok_or_else(|| anyhow!("dangling link from {}", graph.output_label(link.from)))?;
        let to_port = graph
            .inputs(link.to.block)?
            .get(link.to.port)
            .ok_or_else(|| anyhow!("dangling link to {}", graph.input_label(link.to)))?;
        connections.push(Connection {
            from: Endpoint {
                block_id: record_id(link.from.block),
                port: from_port.name().to_string(),
            },
            to: Endpoint {
                block_id: record_id(link.to.block),
                port: to_port.name().to_string(),
            },
        });
    }

    Ok(GraphDSL {
        version: GRAPH_DSL_VERSION.to_string(),
        metadata: Metadata {
            name: name.to_string(),
            ..Default::default()
        },
        blocks,
        connections,
    })
}

pub fn parse_f32(params: &Map<String, Value>, key: &str) -> Option<f32> {
    match params.get(key) {
        Some(v) => v
            .as_f64()
            .map(|x| x as f32)
            .or_else(|| v.as_u64().map(|x| x as f32))
            .or_else(|| v.as_i64().map(|x| x as f32)),
        None => None,
    }
}

pub fn parse_i64(params: &Map<String, Value>, key: &str) -> Option<i64> {
    params.get(key).and_then(Value::as_i64)
}

pub fn parse_bool(params: &Map<String, Value>, key: &str) -> Option<bool> {
    params.get(key).and_then(Value::as_bool)
}

pub fn parse_str<'a>(params: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::blocks::ClampBlock;
    use crate::schema::default_registry;

    const GRAPH: &str = r#"{
        "version": "1.0",
        "metadata": { "name": "clamped time" },
        "blocks": [
            { "id": "time", "customType": "BABYLON.InputBlock", "name": "time",
              "mode": "system", "system": "time" },
            { "id": "clamp", "customType": "BABYLON.ClampBlock", "name": "clamp",
              "minimum": 0.2 }
        ],
        "connections": [
            { "from": { "blockId": "time", "port": "output" },
              "to": { "blockId": "clamp", "port": "value" } }
        ]
    }"#;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dsl: GraphDSL = serde_json::from_str(GRAPH).unwrap();
        let graph = graph_from_dsl(&dsl, default_registry(), &DeserializeContext::default())
            .unwrap();
        let clamp = graph.block_ids().nth(1).unwrap();
        let clamp = graph.block_as::<ClampBlock>(clamp).unwrap();
        assert!((clamp.minimum - 0.2).abs() < 1e-6);
        assert_eq!(clamp.maximum, 1.0);
        assert_eq!(graph.links().len(), 1);
    }

    #[test]
    fn serialized_graph_reloads_to_the_same_record() {
        let dsl: GraphDSL = serde_json::from_str(GRAPH).unwrap();
        let graph = graph_from_dsl(&dsl, default_registry(), &DeserializeContext::default())
            .unwrap();
        let written = graph_to_dsl(&graph, "clamped time").unwrap();
        assert_eq!(written.blocks[0].id, "b0");
        assert_eq!(written.blocks[1].custom_type, "BABYLON.ClampBlock");
        assert_eq!(written.connections[0].to.port, "value");

        let reloaded = graph_from_dsl(&written, default_registry(), &DeserializeContext::default())
            .unwrap();
        assert_eq!(graph_to_dsl(&reloaded, "clamped time").unwrap(), written);
    }

    #[test]
    fn unknown_connection_endpoints_are_errors() {
        let mut dsl: GraphDSL = serde_json::from_str(GRAPH).unwrap();
        dsl.connections[0].from.block_id = "missing".to_string();
        let err = graph_from_dsl(&dsl, default_registry(), &DeserializeContext::default())
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut dsl: GraphDSL = serde_json::from_str(GRAPH).unwrap();
        dsl.blocks[1].id = "time".to_string();
        assert!(graph_from_dsl(&dsl, default_registry(), &DeserializeContext::default()).is_err());
    }

    #[test]
    fn context_resolves_relative_names() {
        let ctx = DeserializeContext::new("assets/");
        assert_eq!(ctx.resolve("lut.png"), "assets/lut.png");
        assert_eq!(ctx.resolve("/abs/lut.png"), "/abs/lut.png");
        assert_eq!(DeserializeContext::default().resolve("lut.png"), "lut.png");
    }
}
