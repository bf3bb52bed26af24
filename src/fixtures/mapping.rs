// Maps decoded MARC21 records to the portal's JSON record layout. Only the
// tags used by the demo records are mapped, everything else is dropped.
use log::debug;
use marc21::{DataField, Marc21Record};
use serde_json::{Map, Value};
use std::collections::HashMap;

struct FieldMapping {
    key: &'static str,
    repeatable: bool,
    subfields: &'static [(char, &'static str)],
}

lazy_static! {
    static ref CONTROL_FIELDS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("001", "control_number");
        m.insert("005", "date_and_time_of_latest_transaction");
        m.insert("008", "fixed_length_data_elements");
        m
    };
    static ref DATA_FIELDS: HashMap<&'static str, FieldMapping> = {
        let mut m = HashMap::new();
        m.insert("020", FieldMapping { key: "international_standard_book_number", repeatable: true, subfields: &[
            ('a', "international_standard_book_number"),
        ]});
        m.insert("024", FieldMapping { key: "other_standard_identifier", repeatable: true, subfields: &[
            ('a', "standard_number_or_code"),
            ('2', "source_of_number_or_code"),
        ]});
        m.insert("037", FieldMapping { key: "source_of_acquisition", repeatable: true, subfields: &[
            ('a', "stock_number"),
        ]});
        m.insert("041", FieldMapping { key: "language_code", repeatable: false, subfields: &[
            ('a', "language_code_of_text_sound_track_or_separate_title"),
        ]});
        m.insert("100", FieldMapping { key: "main_entry_personal_name", repeatable: false, subfields: &[
            ('a', "personal_name"),
            ('e', "relator_term"),
            ('u', "affiliation"),
        ]});
        m.insert("245", FieldMapping { key: "title_statement", repeatable: false, subfields: &[
            ('a', "title"),
            ('b', "remainder_of_title"),
        ]});
        m.insert("246", FieldMapping { key: "varying_form_of_title", repeatable: true, subfields: &[
            ('a', "title_proper_short_title"),
        ]});
        m.insert("250", FieldMapping { key: "edition_statement", repeatable: false, subfields: &[
            ('a', "edition_statement"),
        ]});
        m.insert("256", FieldMapping { key: "computer_file_characteristics", repeatable: false, subfields: &[
            ('a', "computer_file_characteristics"),
        ]});
        m.insert("260", FieldMapping { key: "publication_distribution_imprint", repeatable: true, subfields: &[
            ('a', "place_of_publication_distribution"),
            ('b', "name_of_publisher_distributor"),
            ('c', "date_of_publication_distribution"),
        ]});
        m.insert("300", FieldMapping { key: "physical_description", repeatable: true, subfields: &[
            ('a', "extent"),
        ]});
        m.insert("520", FieldMapping { key: "summary", repeatable: true, subfields: &[
            ('a', "summary"),
            ('b', "expansion_of_summary_note"),
        ]});
        m.insert("540", FieldMapping { key: "terms_governing_use_and_reproduction_note", repeatable: true, subfields: &[
            ('a', "terms_governing_use_and_reproduction"),
            ('u', "uniform_resource_identifier"),
        ]});
        m.insert("650", FieldMapping { key: "subject_added_entry_topical_term", repeatable: true, subfields: &[
            ('a', "topical_term_or_geographic_name_entry_element"),
            ('2', "source_of_heading_or_term"),
        ]});
        m.insert("653", FieldMapping { key: "index_term_uncontrolled", repeatable: true, subfields: &[
            ('a', "uncontrolled_term"),
        ]});
        m.insert("700", FieldMapping { key: "added_entry_personal_name", repeatable: true, subfields: &[
            ('a', "personal_name"),
            ('e', "relator_term"),
            ('u', "affiliation"),
        ]});
        m.insert("710", FieldMapping { key: "added_entry_corporate_name", repeatable: true, subfields: &[
            ('a', "corporate_name_or_jurisdiction_name_as_entry_element"),
            ('g', "miscellaneous_information"),
        ]});
        m.insert("856", FieldMapping { key: "electronic_location_and_access", repeatable: true, subfields: &[
            ('q', "electronic_format_type"),
            ('s', "file_size"),
            ('u', "uniform_resource_identifier"),
            ('y', "link_text"),
        ]});
        m.insert("980", FieldMapping { key: "collections", repeatable: true, subfields: &[
            ('a', "primary"),
            ('b', "secondary"),
        ]});
        m
    };
}

// Subfield codes repeated within a field collect into an array.
fn subfields(field: &DataField, mapping: &FieldMapping) -> Map<String, Value> {
    let mut object = Map::new();
    for subfield in &field.subfields {
        let key = match mapping.subfields.iter().find(|(code, _)| *code == subfield.code) {
            Some((_, key)) => *key,
            None => continue,
        };
        let value = Value::String(subfield.value.clone());
        match object.get_mut(key) {
            None => {
                object.insert(key.to_string(), value);
            }
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = std::mem::replace(existing, Value::Null);
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    object
}

pub fn to_json(record: &Marc21Record) -> Value {
    let mut json = Map::new();
    if let Some(leader) = &record.leader {
        json.insert("leader".to_string(), Value::String(leader.clone()));
    }
    for field in &record.control_fields {
        match CONTROL_FIELDS.get(field.tag.as_str()) {
            Some(key) => {
                json.entry(*key)
                    .or_insert_with(|| Value::String(field.value.clone()));
            }
            None => debug!("Ignoring control field {}.", field.tag),
        }
    }
    for field in &record.data_fields {
        let mapping = match DATA_FIELDS.get(field.tag.as_str()) {
            Some(mapping) => mapping,
            None => {
                debug!("Ignoring data field {}.", field.tag);
                continue;
            }
        };
        let value = subfields(field, mapping);
        if value.is_empty() {
            continue;
        }
        if mapping.repeatable {
            let entry = json
                .entry(mapping.key)
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(values) = entry {
                values.push(Value::Object(value));
            }
        } else if !json.contains_key(mapping.key) {
            json.insert(mapping.key.to_string(), Value::Object(value));
        } else {
            debug!("Ignoring repeated non-repeatable field {}.", field.tag);
        }
    }
    Value::Object(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(content: &str) -> Marc21Record {
        Marc21Record::parse(content).unwrap().remove(0)
    }

    #[test]
    fn control_fields() {
        let json = to_json(&record(
            r#"<record>
  <leader>00000nmm a2200000 a 4500</leader>
  <controlfield tag="001">100</controlfield>
  <controlfield tag="003">SzGeCERN</controlfield>
  <controlfield tag="005">20160601120000.0</controlfield>
</record>"#,
        ));
        assert_eq!(
            json,
            json!({
                "leader": "00000nmm a2200000 a 4500",
                "control_number": "100",
                "date_and_time_of_latest_transaction": "20160601120000.0",
            })
        );
    }

    #[test]
    fn repeatable_and_non_repeatable() {
        let json = to_json(&record(
            r#"<record>
  <datafield tag="245" ind1=" " ind2=" "><subfield code="a">First</subfield></datafield>
  <datafield tag="245" ind1=" " ind2=" "><subfield code="a">Second</subfield></datafield>
  <datafield tag="980" ind1=" " ind2=" "><subfield code="a">CMS-Primary-Datasets</subfield></datafield>
  <datafield tag="980" ind1=" " ind2=" "><subfield code="a">CMS</subfield></datafield>
  <datafield tag="999" ind1=" " ind2=" "><subfield code="a">ignored</subfield></datafield>
</record>"#,
        ));
        let expected: Map<String, Value> = hashmap! {
            "title_statement".to_string() => json!({"title": "First"}),
            "collections".to_string() => json!([
                {"primary": "CMS-Primary-Datasets"},
                {"primary": "CMS"},
            ]),
        }
        .into_iter()
        .collect();
        assert_eq!(json, Value::Object(expected));
    }

    #[test]
    fn repeated_subfields() {
        let json = to_json(&record(
            r#"<record>
  <datafield tag="856" ind1="4" ind2=" ">
    <subfield code="u">http://opendata.cern.ch/record/100/files/a.root</subfield>
    <subfield code="u">http://opendata.cern.ch/record/100/files/b.root</subfield>
    <subfield code="s">1024</subfield>
    <subfield code="z">unmapped</subfield>
  </datafield>
  <datafield tag="650" ind1=" " ind2=" "><subfield code="x">only unmapped</subfield></datafield>
</record>"#,
        ));
        assert_eq!(
            json,
            json!({
                "electronic_location_and_access": [{
                    "uniform_resource_identifier": [
                        "http://opendata.cern.ch/record/100/files/a.root",
                        "http://opendata.cern.ch/record/100/files/b.root",
                    ],
                    "file_size": "1024",
                }],
            })
        );
    }
}
