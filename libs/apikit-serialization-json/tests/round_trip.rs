#![allow(clippy::unwrap_used, clippy::float_cmp)]

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use apikit_abstractions::serialization::{
    enum_value, parse_collection_of_objects, parse_object,
};
use apikit_abstractions::{
    AdditionalData, HttpMethod, Parsable, ParseNode, ParseNodeFactory, ParseNodeFactoryRegistry,
    PrimitiveKind, PrimitiveValue, RequestInformation, SerializationError, SerializationWriter,
    SerializationWriterFactoryRegistry, UntypedNode,
};
use apikit_serialization_json::{JsonParseNodeFactory, JsonSerializationWriterFactory};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Blue,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Red => "red",
            Self::Blue => "blue",
        })
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "red" => Ok(Self::Red),
            "blue" => Ok(Self::Blue),
            other => Err(format!("unknown color '{other}'")),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
struct Child {
    label: Option<String>,
}

impl Parsable for Child {
    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<(), SerializationError> {
        writer.write_string_value(Some("label"), self.label.as_deref())
    }

    fn deserialize_field(
        &mut self,
        name: &str,
        node: &dyn ParseNode,
    ) -> Result<bool, SerializationError> {
        match name {
            "label" => self.label = node.string_value()?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[derive(Debug, Default, PartialEq)]
struct Sample {
    name: Option<String>,
    active: Option<bool>,
    count: Option<i32>,
    total: Option<i64>,
    ratio: Option<f32>,
    score: Option<f64>,
    created: Option<OffsetDateTime>,
    id: Option<Uuid>,
    blob: Option<Vec<u8>>,
    color: Option<Color>,
    tags: Vec<String>,
    child: Option<Child>,
    children: Vec<Child>,
    extra: AdditionalData,
}

impl Parsable for Sample {
    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<(), SerializationError> {
        writer.write_string_value(Some("name"), self.name.as_deref())?;
        writer.write_bool_value(Some("active"), self.active)?;
        writer.write_i32_value(Some("count"), self.count)?;
        writer.write_i64_value(Some("total"), self.total)?;
        writer.write_f32_value(Some("ratio"), self.ratio)?;
        writer.write_f64_value(Some("score"), self.score)?;
        writer.write_time_value(Some("created"), self.created)?;
        writer.write_uuid_value(Some("id"), self.id)?;
        writer.write_byte_array_value(Some("blob"), self.blob.as_deref())?;
        writer.write_enum_value(
            Some("color"),
            self.color.as_ref().map(|c| c as &dyn fmt::Display),
        )?;
        let tags: Vec<_> = self
            .tags
            .iter()
            .map(|t| PrimitiveValue::from(t.as_str()))
            .collect();
        writer.write_collection_of_primitive_values(Some("tags"), &tags)?;
        writer.write_object_value(Some("child"), self.child.as_ref().map(|c| c as &dyn Parsable))?;
        let children: Vec<&dyn Parsable> =
            self.children.iter().map(|c| c as &dyn Parsable).collect();
        writer.write_collection_of_object_values(Some("children"), &children)?;
        writer.write_additional_data(&self.extra)
    }

    fn deserialize_field(
        &mut self,
        name: &str,
        node: &dyn ParseNode,
    ) -> Result<bool, SerializationError> {
        match name {
            "name" => self.name = node.string_value()?,
            "active" => self.active = node.bool_value()?,
            "count" => self.count = node.i32_value()?,
            "total" => self.total = node.i64_value()?,
            "ratio" => self.ratio = node.f32_value()?,
            "score" => self.score = node.f64_value()?,
            "created" => self.created = node.time_value()?,
            "id" => self.id = node.uuid_value()?,
            "blob" => self.blob = node.byte_array_value()?,
            "color" => self.color = enum_value(node)?,
            "tags" => {
                self.tags = node
                    .collection_of_primitive_values(PrimitiveKind::String)?
                    .into_iter()
                    .filter_map(|v| match v {
                        PrimitiveValue::String(s) => Some(s),
                        _ => None,
                    })
                    .collect();
            }
            "child" => self.child = parse_object(node)?,
            "children" => self.children = parse_collection_of_objects(node)?.unwrap_or_default(),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn additional_data(&self) -> Option<&AdditionalData> {
        Some(&self.extra)
    }

    fn additional_data_mut(&mut self) -> Option<&mut AdditionalData> {
        Some(&mut self.extra)
    }
}

fn sample() -> Sample {
    let mut extra = AdditionalData::new();
    extra.insert("legacyCode".into(), UntypedNode::String("x-1".into()));
    extra.insert(
        "weights".into(),
        UntypedNode::Array(vec![UntypedNode::Integer(1), UntypedNode::Integer(2)]),
    );

    Sample {
        name: Some("widget".into()),
        active: Some(true),
        count: Some(-12),
        total: Some(9_000_000_000),
        ratio: Some(0.1),
        score: Some(98.625),
        created: Some(OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()),
        id: Some(Uuid::parse_str("0b7d2c4e-8d3a-4a52-9f1e-3c9b5d7a1e20").unwrap()),
        blob: Some(vec![0, 1, 2, 250, 255]),
        color: Some(Color::Blue),
        tags: vec!["a".into(), "b c".into()],
        child: Some(Child {
            label: Some("solo".into()),
        }),
        children: vec![
            Child {
                label: Some("first".into()),
            },
            Child { label: None },
        ],
        extra,
    }
}

#[test]
fn test_model_round_trips_through_json() {
    let writers = SerializationWriterFactoryRegistry::new();
    writers.register_default(JsonSerializationWriterFactory).unwrap();
    let parse_nodes = ParseNodeFactoryRegistry::new();
    parse_nodes.register_default(JsonParseNodeFactory).unwrap();

    let original = sample();
    let mut request =
        RequestInformation::new(HttpMethod::Post, "{+baseurl}/samples", HashMap::new());
    request
        .set_content_from_parsable(&writers, "application/json", &original)
        .unwrap();

    assert_eq!(request.headers.get("content-type"), Some("application/json"));
    let body = request.content.clone().unwrap();

    let root = parse_nodes.root_parse_node("application/json", &body).unwrap();
    let decoded = parse_object::<Sample>(root.as_ref()).unwrap().unwrap();

    assert_eq!(decoded, original);
}

#[test]
fn test_collection_body_round_trips() {
    let writers = SerializationWriterFactoryRegistry::new();
    writers.register_default(JsonSerializationWriterFactory).unwrap();

    let items = [
        Child {
            label: Some("x".into()),
        },
        Child {
            label: Some("y".into()),
        },
    ];
    let refs: Vec<&dyn Parsable> = items.iter().map(|c| c as &dyn Parsable).collect();
    let mut request = RequestInformation::default();
    request
        .set_content_from_parsable_collection(&writers, "application/vnd.acme+json", &refs)
        .unwrap();

    let body = request.content.clone().unwrap();
    let root = JsonParseNodeFactory
        .root_parse_node("application/json", &body)
        .unwrap();
    let decoded = parse_collection_of_objects::<Child>(root.as_ref())
        .unwrap()
        .unwrap();
    assert_eq!(decoded, items);
}

#[test]
fn test_scalar_body() {
    let writers = SerializationWriterFactoryRegistry::new();
    writers.register_default(JsonSerializationWriterFactory).unwrap();

    let mut request = RequestInformation::default();
    request
        .set_content_from_scalar(&writers, "application/json", &PrimitiveValue::Int64(42))
        .unwrap();

    assert_eq!(request.content.as_deref(), Some(&b"42"[..]));
}
