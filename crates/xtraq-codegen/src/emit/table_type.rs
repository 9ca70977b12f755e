//! Table-type DTO emission:
//! every user-defined table type becomes a plain record with one property
//! per column, used as the CLR shape passed to table-valued parameters.

use std::path::PathBuf;

use xtraq_common::model::TableTypeInfo;

use crate::emit::Emit;
use crate::naming::pascal_case_identifier;
use crate::sql_types::render_clr_type;
use crate::templates::{FileModel, TemplateCoordinator};
use xtraq_common::error::Result;

pub struct TableTypeEmitter<'a> {
    pub coordinator: &'a TemplateCoordinator,
    pub namespace: String,
}

impl<'a> Emit for TableTypeEmitter<'a> {
    type Model = TableTypeInfo;

    fn target_path(&self, model: &Self::Model) -> PathBuf {
        PathBuf::from(format!("{}.g.cs", dto_type_name(model)))
    }

    fn emit(&self, model: &Self::Model) -> Result<String> {
        let type_name = dto_type_name(model);
        let mut body = String::new();
        body.push_str(&format!("    public sealed partial record {type_name}\n    {{\n"));
        for column in &model.columns {
            let property_name = pascal_case_identifier(&column.name);
            let clr_type = render_clr_type(&column.sql_type, column.is_nullable);
            body.push_str(&format!("        public {clr_type} {property_name} {{ get; init; }}\n"));
        }
        body.push_str("    }\n");

        let file_model = FileModel {
            namespace: self.namespace.clone(),
            usings: vec!["System".to_string()],
            body,
        };
        self.coordinator.render_file("file", &file_model)
    }
}

fn dto_type_name(model: &TableTypeInfo) -> String {
    format!("{}Row", pascal_case_identifier(&model.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtraq_common::model::TableTypeColumn;

    #[test]
    fn emits_a_record_with_one_property_per_column() {
        let coordinator = TemplateCoordinator::new(None);
        let emitter = TableTypeEmitter { coordinator: &coordinator, namespace: "Xtraq.Dbo".to_string() };
        let table_type = TableTypeInfo {
            catalog: None,
            schema: "dbo".to_string(),
            name: "UserIdList".to_string(),
            columns: vec![TableTypeColumn { name: "Id".to_string(), sql_type: "int".to_string(), is_nullable: false, max_length: None }],
        };
        let rendered = emitter.emit(&table_type).unwrap();
        assert!(rendered.contains("public sealed partial record UserIdListRow"));
        assert!(rendered.contains("public int Id { get; init; }"));
    }
}
