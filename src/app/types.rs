use serde::{Deserialize, Serialize};

/// 远端设置集合名（URL 路径前缀）
pub const SETTINGS_COLLECTION: &str = "better-chat-gpt";

/// 本地持久化存储使用的固定 key
pub const DEFAULT_STORAGE_KEY: &str = "free-chat-gpt";

/// 派生 key 前后各取的字符数
const DERIVED_KEY_HALF: usize = 5;

/// 由 API Key 派生远端存储 key：前 5 个字符 + 后 5 个字符
///
/// 不是加密派生，仅作为远端寻址用的弱标识。
/// 不足 5 个字符时前后两段都是完整字符串（与切片语义一致）。
pub fn derive_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    let head_end = chars.len().min(DERIVED_KEY_HALF);
    let tail_start = chars.len().saturating_sub(DERIVED_KEY_HALF);
    chars[..head_end]
        .iter()
        .chain(chars[tail_start..].iter())
        .collect()
}

/// 持久化的应用状态（本地和远端共用同一结构）
///
/// 只解析同步逻辑需要的字段，其余字段原样保留在 `extra` 中，
/// 保证读写一轮后不会丢数据。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    /// OpenAI API Key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// 设置版本号，每次上传递增
    #[serde(default)]
    pub cache_id: i64,
    /// 会话列表
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chats: Option<Vec<ChatInterface>>,
    /// 当前激活的会话下标
    #[serde(default)]
    pub current_chat_index: i64,
    /// 其余未建模的字段（主题、语言、提示词等）
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl StoreState {
    /// 返回非空的 API Key
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    /// 当前会话下标是否落在 [0, len) 内
    pub fn chat_index_in_range(&self) -> bool {
        let len = self.chats.as_ref().map_or(0, |c| c.len()) as i64;
        self.current_chat_index >= 0 && self.current_chat_index < len
    }
}

/// 本地存储中的包装结构：`{ "state": {...}, "version": N }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSettings {
    pub state: StoreState,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// 会话
///
/// 会话结构由外部定义，这里只建模需要用到的字段，缺失字段取默认值，
/// 未知字段原样保留在 `extra` 中。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatInterface {
    pub id: String,
    pub title: String,
    pub messages: Vec<MessageInterface>,
    pub config: ChatConfig,
    pub title_set: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// 单条消息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageInterface {
    pub role: Role,
    pub content: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[default]
    User,
    Assistant,
    /// 未识别的角色，原样保留
    #[serde(untagged)]
    Other(String),
}

/// 会话的模型参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub presence_penalty: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 4000,
            temperature: 1.0,
            presence_penalty: 0.0,
            top_p: 1.0,
            frequency_penalty: 0.0,
            extra: serde_json::Map::new(),
        }
    }
}
