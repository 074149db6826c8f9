// Shared prompt fragments.
// Each engine module that issues generation calls defines its own prompts.rs alongside it.

/// Closing instruction on every structured prompt. The model is a plain causal LM,
/// so the format has to be restated right before the output slot.
pub const JSON_ONLY_INSTRUCTION: &str =
    "반드시 위 JSON 형식으로만 출력하고, 다른 설명은 절대 추가하지 마세요.";

/// Header that opens the output slot of every prompt.
pub const OUTPUT_HEADER: &str = "### 출력:\n";

/// Placeholder used when a prompt section has no content.
pub const NONE_PLACEHOLDER: &str = "없음";
