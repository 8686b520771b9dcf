use serde_json::Value;

/// Known places a provider nests the generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `candidates[0].content.parts[*].text`
    GeminiCandidates,
    /// `candidates[0].content` as a plain string
    LegacyCandidates,
    /// `predictions[0].content`
    Predictions,
    /// `choices[0].message.content`
    ChatChoices,
}

impl ResponseShape {
    /// Tried in this order; the first shape yielding text wins.
    pub const ALL: [ResponseShape; 4] = [
        ResponseShape::GeminiCandidates,
        ResponseShape::LegacyCandidates,
        ResponseShape::Predictions,
        ResponseShape::ChatChoices,
    ];

    pub fn extract(self, value: &Value) -> Option<String> {
        let text = match self {
            ResponseShape::GeminiCandidates => value
                .pointer("/candidates/0/content/parts")?
                .as_array()?
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<String>(),
            ResponseShape::LegacyCandidates => {
                value.pointer("/candidates/0/content")?.as_str()?.to_string()
            }
            ResponseShape::Predictions => {
                value.pointer("/predictions/0/content")?.as_str()?.to_string()
            }
            ResponseShape::ChatChoices => value
                .pointer("/choices/0/message/content")?
                .as_str()?
                .to_string(),
        };
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Pull the generated text out of a provider response.
pub fn extract_text(value: &Value) -> Option<(ResponseShape, String)> {
    ResponseShape::ALL
        .into_iter()
        .find_map(|shape| shape.extract(value).map(|text| (shape, text)))
}
