use serde::{Deserialize, Serialize};

/// Input for both verbs: JSON body on POST, query string on GET.
#[derive(Debug, Default, Deserialize)]
pub struct HolaInput {
    #[serde(default)]
    pub cadena: Option<String>,
}

impl HolaInput {
    pub fn cadena(self) -> String {
        self.cadena.unwrap_or_default()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HolaResponse {
    pub resultado: String,
}
