//! Built-in block definitions.

use serde_json::json;

use super::{BlockCategory, BlockConfig, BlockType, ParamType, Port, SubBlockConfig, SubBlockKind};

pub(super) fn all() -> Vec<BlockConfig> {
    vec![
        whatsapp_message(),
        webhook(),
        scheduled(),
        condition(),
        switch(),
        keyword(),
        delay(),
        set_variable(),
        end_flow(),
        gpt_analyze(),
        gpt_respond(),
        send_text(),
        send_image(),
        http_request(),
    ]
}

fn whatsapp_message() -> BlockConfig {
    BlockConfig {
        block_type: BlockType::WhatsappMessage,
        name: "WhatsApp message",
        description: "Starts the workflow when a WhatsApp message is received",
        category: BlockCategory::Triggers,
        sub_blocks: vec![],
        inputs: vec![],
        outputs: vec![
            Port::new("message", ParamType::String, "Text of the received message"),
            Port::new("from", ParamType::String, "Sender phone number"),
            Port::new("sessionId", ParamType::String, "Conversation identifier"),
        ],
    }
}

fn webhook() -> BlockConfig {
    BlockConfig {
        block_type: BlockType::Webhook,
        name: "Webhook",
        description: "Starts the workflow when an HTTP call hits the automation endpoint",
        category: BlockCategory::Triggers,
        sub_blocks: vec![SubBlockConfig::new("path", "Endpoint path", SubBlockKind::ShortInput)],
        inputs: vec![],
        outputs: vec![Port::new("body", ParamType::Json, "Request body")],
    }
}

fn scheduled() -> BlockConfig {
    BlockConfig {
        block_type: BlockType::Scheduled,
        name: "Schedule",
        description: "Starts the workflow on a schedule",
        category: BlockCategory::Triggers,
        sub_blocks: vec![SubBlockConfig::new("cron", "Cron expression", SubBlockKind::ShortInput)],
        inputs: vec![],
        outputs: vec![Port::new("firedAt", ParamType::String, "Time the schedule fired")],
    }
}

fn condition() -> BlockConfig {
    BlockConfig {
        block_type: BlockType::Condition,
        name: "Condition (IF/ELSE)",
        description: "Splits the flow according to one or more logical conditions",
        category: BlockCategory::Logic,
        sub_blocks: vec![
            SubBlockConfig::new("conditions", "Conditions", SubBlockKind::ConditionInput).default_value(json!([])),
            SubBlockConfig::new("defaultBranch", "Default branch (ELSE)", SubBlockKind::Switch).default_value(true),
            SubBlockConfig::new("evaluationMode", "Evaluation mode", SubBlockKind::Dropdown)
                .options(&["first_match", "all_match", "any_match"])
                .default_value("first_match"),
        ],
        inputs: vec![Port::new("input", ParamType::Any, "Data to evaluate")],
        outputs: vec![
            Port::new("result", ParamType::Boolean, "Whether the conditions matched"),
            Port::new("matchedCondition", ParamType::String, "Id of the matching condition"),
            Port::new("branch", ParamType::String, "Selected branch"),
        ],
    }
}

fn switch() -> BlockConfig {
    BlockConfig {
        block_type: BlockType::Switch,
        name: "Switch (Router)",
        description: "Routes the flow to a branch according to the value of a field",
        category: BlockCategory::Logic,
        sub_blocks: vec![
            SubBlockConfig::new("inputField", "Field to evaluate", SubBlockKind::ShortInput).required(),
            SubBlockConfig::new("cases", "Cases (one per line)", SubBlockKind::LongInput).required(),
            SubBlockConfig::new("caseSensitive", "Case sensitive", SubBlockKind::Switch).default_value(false),
            SubBlockConfig::new("defaultCase", "Default case", SubBlockKind::Switch).default_value(true),
            SubBlockConfig::new("matchMode", "Match mode", SubBlockKind::Dropdown)
                .options(&["exact", "contains", "startsWith", "endsWith", "regex"])
                .default_value("exact"),
            SubBlockConfig::new("trimInput", "Trim whitespace", SubBlockKind::Switch).default_value(true),
        ],
        inputs: vec![Port::new("value", ParamType::String, "Value used for routing")],
        outputs: vec![
            Port::new("matchedCase", ParamType::String, "The case that matched"),
            Port::new("inputValue", ParamType::String, "Original value of the evaluated field"),
            Port::new("caseIndex", ParamType::Number, "Index of the matching case (0-based, -1 when none)"),
            Port::new("isDefault", ParamType::Boolean, "True when no case matched"),
        ],
    }
}

fn keyword() -> BlockConfig {
    BlockConfig {
        block_type: BlockType::Keyword,
        name: "Keyword filter",
        description: "Continues only when the message contains one of the keywords",
        category: BlockCategory::Logic,
        sub_blocks: vec![
            SubBlockConfig::new("keywords", "Keywords (one per line)", SubBlockKind::LongInput).default_value(""),
            SubBlockConfig::new("inputField", "Field to inspect", SubBlockKind::ShortInput).default_value("<trigger.message>"),
        ],
        inputs: vec![Port::new("text", ParamType::String, "Text to inspect")],
        outputs: vec![
            Port::new("keywordTriggered", ParamType::Boolean, "Whether a keyword was found"),
            Port::new("matchedKeyword", ParamType::String, "The keyword that matched"),
        ],
    }
}

fn delay() -> BlockConfig {
    BlockConfig {
        block_type: BlockType::Delay,
        name: "Delay",
        description: "Pauses the flow for a number of seconds",
        category: BlockCategory::Logic,
        sub_blocks: vec![SubBlockConfig::new("delaySeconds", "Delay (seconds)", SubBlockKind::NumberInput).default_value(5)],
        inputs: vec![],
        outputs: vec![Port::new("waitedMs", ParamType::Number, "Applied delay in milliseconds")],
    }
}

fn set_variable() -> BlockConfig {
    BlockConfig {
        block_type: BlockType::SetVariable,
        name: "Set variables",
        description: "Assigns values to workflow variables",
        category: BlockCategory::Logic,
        sub_blocks: vec![SubBlockConfig::new("variables", "Variables", SubBlockKind::VariablesInput).default_value(json!([]))],
        inputs: vec![],
        outputs: vec![Port::new("variables", ParamType::Object, "Assigned variables")],
    }
}

fn end_flow() -> BlockConfig {
    BlockConfig {
        block_type: BlockType::EndFlow,
        name: "End flow",
        description: "Stops the workflow, optionally with a closing message",
        category: BlockCategory::Logic,
        sub_blocks: vec![
            SubBlockConfig::new("action", "Action", SubBlockKind::Dropdown).options(&["stop", "message"]).default_value("stop"),
            SubBlockConfig::new("message", "Closing message", SubBlockKind::LongInput).default_value(""),
        ],
        inputs: vec![],
        outputs: vec![],
    }
}

fn gpt_analyze() -> BlockConfig {
    BlockConfig {
        block_type: BlockType::GptAnalyze,
        name: "AI analysis",
        description: "Classifies the intent, urgency and sentiment of a message",
        category: BlockCategory::Ai,
        sub_blocks: vec![
            SubBlockConfig::new("inputField", "Text to analyze", SubBlockKind::ShortInput).default_value("<trigger.message>"),
            SubBlockConfig::new("categories", "Categories (one per line)", SubBlockKind::LongInput).default_value(""),
            SubBlockConfig::new("aiInstructions", "Instructions", SubBlockKind::LongInput).default_value(""),
            SubBlockConfig::new("localFallback", "Local fallback", SubBlockKind::Switch).default_value(false),
        ],
        inputs: vec![Port::new("text", ParamType::String, "Text to classify")],
        outputs: vec![
            Port::new("intent", ParamType::String, "Detected intent"),
            Port::new("urgency", ParamType::Number, "Urgency from 1 to 5"),
            Port::new("sentiment", ParamType::String, "Detected sentiment"),
        ],
    }
}

fn gpt_respond() -> BlockConfig {
    BlockConfig {
        block_type: BlockType::GptRespond,
        name: "AI reply",
        description: "Writes a reply adapted to the detected intent and sends it",
        category: BlockCategory::Ai,
        sub_blocks: vec![
            SubBlockConfig::new("inputField", "Message to answer", SubBlockKind::ShortInput).default_value("<trigger.message>"),
            SubBlockConfig::new("system", "System prompt", SubBlockKind::LongInput).default_value(""),
            SubBlockConfig::new("aiInstructions", "Instructions", SubBlockKind::LongInput).default_value(""),
            SubBlockConfig::new("model", "Model", SubBlockKind::ShortInput).default_value("gpt-4o"),
            SubBlockConfig::new("recipient", "Recipient", SubBlockKind::ShortInput).default_value(""),
        ],
        inputs: vec![Port::new("message", ParamType::String, "Message to answer")],
        outputs: vec![
            Port::new("aiResponse", ParamType::String, "Generated reply"),
            Port::new("messageId", ParamType::String, "Id of the sent message"),
            Port::new("status", ParamType::String, "Delivery status"),
        ],
    }
}

fn send_text() -> BlockConfig {
    BlockConfig {
        block_type: BlockType::SendText,
        name: "Send a message",
        description: "Sends a WhatsApp text message",
        category: BlockCategory::Messages,
        sub_blocks: vec![
            SubBlockConfig::new("message", "Message", SubBlockKind::LongInput).required(),
            SubBlockConfig::new("recipient", "Recipient", SubBlockKind::ShortInput).default_value(""),
            SubBlockConfig::new("parseMode", "Formatting", SubBlockKind::Dropdown).options(&["plain", "whatsapp"]).default_value("whatsapp"),
            SubBlockConfig::new("previewUrl", "Link preview", SubBlockKind::Switch).default_value(true),
        ],
        inputs: vec![
            Port::new("message", ParamType::String, "Content of the message"),
            Port::new("recipient", ParamType::String, "Recipient number, defaults to the current contact"),
        ],
        outputs: vec![
            Port::new("messageId", ParamType::String, "Id of the sent message"),
            Port::new("status", ParamType::String, "Delivery status"),
            Port::new("timestamp", ParamType::Number, "Send time in milliseconds"),
        ],
    }
}

fn send_image() -> BlockConfig {
    BlockConfig {
        block_type: BlockType::SendImage,
        name: "Send an image",
        description: "Sends an image with an optional caption",
        category: BlockCategory::Messages,
        sub_blocks: vec![
            SubBlockConfig::new("url", "Image URL", SubBlockKind::ShortInput).required(),
            SubBlockConfig::new("caption", "Caption", SubBlockKind::LongInput).default_value(""),
            SubBlockConfig::new("recipient", "Recipient", SubBlockKind::ShortInput).default_value(""),
        ],
        inputs: vec![Port::new("url", ParamType::String, "Image location")],
        outputs: vec![
            Port::new("messageId", ParamType::String, "Id of the sent message"),
            Port::new("status", ParamType::String, "Delivery status"),
        ],
    }
}

fn http_request() -> BlockConfig {
    BlockConfig {
        block_type: BlockType::HttpRequest,
        name: "HTTP request",
        description: "Calls an external HTTP API",
        category: BlockCategory::Tools,
        sub_blocks: vec![
            SubBlockConfig::new("url", "URL", SubBlockKind::ShortInput).required(),
            SubBlockConfig::new("method", "Method", SubBlockKind::Dropdown)
                .options(&["GET", "POST", "PUT", "PATCH", "DELETE"])
                .default_value("GET"),
            SubBlockConfig::new("headers", "Headers", SubBlockKind::KeyValue).default_value(json!({})),
            SubBlockConfig::new("body", "Body", SubBlockKind::LongInput).default_value(""),
            SubBlockConfig::new("authType", "Authorization", SubBlockKind::Dropdown).options(&["none", "bearer", "basic"]).default_value("none"),
            SubBlockConfig::new("authToken", "Token or user:password", SubBlockKind::ShortInput).default_value(""),
        ],
        inputs: vec![],
        outputs: vec![
            Port::new("statusCode", ParamType::Number, "HTTP status code"),
            Port::new("body", ParamType::Json, "Response body"),
            Port::new("headers", ParamType::Object, "Response headers"),
        ],
    }
}
