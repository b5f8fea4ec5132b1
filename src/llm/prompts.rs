//! Fixed prompt text and the canned demo answers used when no provider is
//! reachable.

pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant for the \"Parent in the Loop\" platform. \
You help parents understand their child's school documents, navigate educational processes, \
and advocate for their children.

Key guidelines:
- Use simple, clear language that's easy to understand
- Be supportive and encouraging to parents
- Focus on practical, actionable advice
- Help parents understand their rights and options
- If discussing school documents or processes, explain them in plain terms
- Always be respectful of different family backgrounds and circumstances";

pub const HOMEWORK_PROMPT: &str = "Please analyze this homework image and provide helpful feedback. Consider:

1. Subject and grade level assessment
2. Correctness of answers (if visible)
3. Areas for improvement
4. Positive reinforcement
5. Next steps or study suggestions

Format your response with clear sections and be encouraging while providing constructive feedback.";

pub const DEMO_HOMEWORK_FEEDBACK: &str = "📚 **Homework Analysis** (Demo Mode)

**Subject Assessment:**
This appears to be elementary-level homework. Great job on attempting all the problems!

**Positive Points:**
✅ Clear handwriting and organization
✅ Good effort shown in problem-solving approach
✅ Work is neatly presented

**Areas for Improvement:**
📝 Double-check your calculations on problems 3 and 5
📝 Consider showing more work steps for complex problems
📝 Review multiplication tables for faster computation

**Next Steps:**
🎯 Practice similar problems for 10-15 minutes daily
🎯 Use visual aids or manipulatives for difficult concepts
🎯 Ask your teacher about any confusing topics

**Encouragement:**
Keep up the great work! Learning is a process, and every mistake is a step toward understanding. You're doing amazing! 🌟

*Note: This is demo feedback. Connect an AI service for detailed analysis.*";

pub fn demo_chat_response(message: &str) -> String {
    format!(
        "I understand you're asking about: '{}'. I'm here to help you with your child's school. \
         Let me look at your school papers and help you know what to do. I will give you simple \
         steps to follow. (This is a demo response - please connect an AI service for real conversations.)",
        message
    )
}
