//! # Prompt templates
//!
//! The literal prompt text sent to the language model. Two shapes: a
//! grounded single-answer prompt and an N-suggestion prompt with a distinct
//! instructed tone per slot. Both constrain the model to the retrieved
//! document context and nothing else.

/// `Dear <name>,` when a client name is known, a plain `Hello,` otherwise.
pub fn client_greeting(client_name: Option<&str>) -> String {
    match client_name {
        Some(name) if !name.trim().is_empty() => format!("Dear {name},"),
        _ => "Hello,".to_string(),
    }
}

fn conversation_block(conversation_context: &str) -> String {
    if conversation_context.is_empty() {
        String::new()
    } else {
        format!("Previous conversation:\n{conversation_context}\n")
    }
}

/// Single grounded answer, with prior conversation woven in when present.
pub fn qa_prompt(context: &str, conversation_context: &str, question: &str) -> String {
    let conversation = conversation_block(conversation_context);
    format!(
        "You are a helpful business assistant helping sales, marketing, and office teams. \
Answer questions naturally and conversationally.

Information from documents:
{context}

{conversation}
Question: {question}

Answer guidelines:
- Use clear, everyday business language - no technical terms
- Be conversational and friendly, like talking to a colleague
- Keep answers concise but complete (2-3 sentences when possible)
- Focus on what matters for business decisions
- Never mention code, file paths, or technical details
- CRITICAL: Only use information from the provided context documents above
- If the information isn't in the documents, say \"I don't have that information in the documents\" - do NOT make up or guess information
- If this is a follow-up question, reference the previous conversation naturally

Provide a helpful, personalized answer based ONLY on the document context:"
    )
}

/// Exactly `n` labeled response options for a client inquiry.
///
/// Slot tones are fixed: the first empathetic, the second solution-oriented,
/// any further ones varied. The multi-question instruction makes the model
/// cover every sub-question of a compound inquiry in each option.
pub fn suggestion_prompt(
    n: usize,
    client_name: Option<&str>,
    conversation_context: &str,
    context: &str,
    question: &str,
) -> String {
    let greeting = client_greeting(client_name);
    let name = client_name.unwrap_or("Not provided");
    let conversation = conversation_block(conversation_context);
    format!(
        "You are a customer service representative helping clients with inquiries. \
Generate {n} different response options that are friendly, accommodating, heartfelt, \
empathizing, professional, and personalized.

Client Information:
- Client Name: {name}
- Inquiry: {question}

Information from company documents:
{context}

{conversation}
Response Guidelines:
- Address the client by name if provided: {greeting}
- Be warm, empathetic, and understanding
- Show genuine care and concern for their situation
- Use natural, conversational language - NOT generic or AI-sounding
- IMPORTANT: If the inquiry contains multiple questions, make sure to answer ALL questions comprehensively
- When multiple questions are present, organize your response to address each question clearly
- Each response should have a slightly different tone or approach:
  * Response 1: More empathetic and understanding
  * Response 2: More solution-focused and action-oriented
  * Response 3+: Vary between warm, professional, or solution-oriented
- Personalize based on their specific inquiry
- Only use information from the provided documents - if information isn't available, acknowledge it gracefully
- Keep responses concise but complete (3-4 sentences for single questions, 5-7 sentences for multiple questions)
- Make each response feel human-written and unique

Generate {n} different response options, each numbered clearly (Response 1, Response 2, etc.). \
Each should be complete and ready to send to the client.

Format your response as:
Response 1: [first response option]
Response 2: [second response option]
[Add more if more options were requested]"
    )
}
