use std::collections::BTreeMap;

use sel_query::schema::{Field, FieldType};
use sel_query::{generate, parser, GeneratorConfig, Schema};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut label_fields = BTreeMap::new();
    label_fields.insert("name".to_string(), Field::leaf(FieldType::Str));
    label_fields.insert("score".to_string(), Field::leaf(FieldType::Float));

    let mut media_fields = BTreeMap::new();
    media_fields.insert("label".to_string(), Field::nested(label_fields));

    let mut root = BTreeMap::new();
    root.insert("deleted".to_string(), Field::leaf(FieldType::Boolean));
    root.insert("media".to_string(), Field::object(media_fields));

    let schema = Schema::new(root)?;
    let mut config = GeneratorConfig::default();
    config.exclude_deleted_documents = true;

    let ir = parser::parse("media.label.name = bag and media.label.score > 3")?;
    let (compiled, warnings) = generate(&ir, &schema, &config)?;

    for warning in &warnings {
        eprintln!("warning: {warning}");
    }

    println!("{}", serde_json::to_string_pretty(&compiled.query)?);
    Ok(())
}
