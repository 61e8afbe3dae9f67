use serde::Serialize;
use serde_json::Value;

use crate::api::codec::encode_data;
use crate::error::{Error, Result};

/// One outbound api call: method name, ordered data items and an optional type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub method: String,
    pub data: Vec<Value>,
    pub request_type: Option<String>,
}

impl Request {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            data: Vec::new(),
            request_type: None,
        }
    }

    pub fn add_data<T: Serialize>(&mut self, item: T) -> Result<&mut Self> {
        self.data.push(serde_json::to_value(item).map_err(Error::Encode)?);
        Ok(self)
    }

    pub fn set_data(&mut self, data: Vec<Value>) -> &mut Self {
        self.data = data;
        self
    }

    pub fn set_type(&mut self, request_type: impl Into<String>) -> &mut Self {
        self.request_type = Some(request_type.into()).filter(|t: &String| !t.is_empty());
        self
    }

    /// Form fields in wire order, without the access token.
    pub fn form_fields(&self, unix_ts: i64) -> Result<Vec<(&'static str, String)>> {
        let mut fields = vec![
            ("method_name", self.method.to_owned()),
            ("data", encode_data(&self.data)?),
            ("time", unix_ts.to_string()),
        ];
        if let Some(request_type) = &self.request_type {
            fields.push(("type", request_type.to_owned()));
        }
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fields_without_type_or_data() {
        let request = Request::new("shop.list.get");
        let fields = request.form_fields(1_700_000_000).unwrap();
        assert_eq!(
            fields,
            vec![
                ("method_name", "shop.list.get".to_owned()),
                ("data", "[]".to_owned()),
                ("time", "1700000000".to_owned()),
            ]
        );
    }

    #[test]
    fn type_is_appended_after_time() {
        let mut request = Request::new("spu.item.save");
        request
            .add_data(json!({"spu_id": 42}))
            .unwrap()
            .set_type("goods");
        let fields = request.form_fields(1).unwrap();
        assert_eq!(fields[1], ("data", r#"[{"spu_id":42}]"#.to_owned()));
        assert_eq!(fields.last().unwrap(), &("type", "goods".to_owned()));
    }

    #[test]
    fn empty_type_is_ignored() {
        let mut request = Request::new("tag.list.get");
        request.set_type("");
        assert!(request.request_type.is_none());
    }
}
