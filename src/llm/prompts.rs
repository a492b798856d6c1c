//! Prompt templates for answer generation and judging.
//!
//! All templates are Chinese, matching the benchmark corpus. Judge prompts
//! ask for a verdict wrapped in a `<result>` tag so parsing stays robust
//! against extra reasoning text.

/// Separator between retrieved passages in the answer prompt context.
const CONTEXT_SEPARATOR: &str = "\n---\n";

const RAG_ANSWER_TEMPLATE: &str = "根据参考资料回答问题。\n\n问题：{query}\n\n参考资料：\n{context}\n\n请回答：{query}";

const CORRECTNESS_TEMPLATE: &str = r#"你是一个专业的评估专家，需要评估AI系统回答的正确性。

<task_description>
请仔细比较AI回答和标准答案，判断AI回答是否在事实上与标准答案一致。
评估时需要关注：
1. 事实准确性 - 核心事实是否正确
2. 逻辑一致性 - 推理逻辑是否合理
3. 关键信息 - 重要信息点是否正确
</task_description>

<question>
{query}
</question>

<ai_answer>
{answer}
</ai_answer>

<golden_answer>
{golden_answer}
</golden_answer>

<instructions>
请仔细分析AI回答与标准答案的一致性。
如果AI回答在事实上与标准答案一致（允许表述差异但事实完全正确），请输出：<result>是</result>
如果AI回答在事实上与标准答案不一致或存在错误，请输出：<result>否</result>
</instructions>

<examples>
- "100美金" 和 "100-200美金" 为不一致。
</examples>

请给出你的判断（<result>是</result>或<result>否</result>）："#;

const COMPLETENESS_TEMPLATE: &str = r#"你是一个专业的评估专家，需要评估AI系统回答的完整性。

<task_description>
请评估AI回答是否完整地回答了问题，包含了标准答案中的所有重要信息点。
评估时需要关注：
1. 信息覆盖程度 - 是否包含所有关键信息点
2. 结构完整性 - 是否全面回答了问题的各个方面
3. 细节充分性 - 重要细节是否有遗漏
允许AI回答有额外的合理信息，但不能缺少标准答案中的核心内容。
</task_description>

<question>
{query}
</question>

<ai_answer>
{answer}
</ai_answer>

<golden_answer>
{golden_answer}
</golden_answer>

<instructions>
请仔细对比AI回答与标准答案，分析信息点的覆盖情况。
如果AI回答包含了标准答案中的所有主要信息点，请输出：<result>是</result>
如果AI回答缺少了标准答案中的重要信息点，请输出：<result>否</result>
</instructions>

请给出你的判断（<result>是</result>或<result>否</result>）："#;

const FAITHFULNESS_TEMPLATE: &str = r#"你是一个专业的评估专家，需要评估AI系统回答的忠诚度。

<task_description>
请判断AI回答是否存在幻觉。

例子：
- AI回答是「我不知道」，正确答案是「1500元」，忠诚度为是。
- AI回答是「1000元」，正确答案是「1500元」，忠诚度为否。
- AI回答是「1500元」，正确答案是「1500元」，忠诚度为是。
</task_description>

<question>
{query}
</question>

<ai_answer>
{answer}
</ai_answer>

<golden_answer>
{golden_answer}
</golden_answer>

请给出你的判断（<result>是</result>或<result>否</result>）："#;

/// Prompt builders for the benchmark pipeline.
pub struct Prompts;

impl Prompts {
    /// Build the grounded-answer prompt from a query and retrieved passages.
    pub fn rag_answer(query: &str, passages: &[String]) -> String {
        let context = passages.join(CONTEXT_SEPARATOR);
        RAG_ANSWER_TEMPLATE
            .replace("{query}", query)
            .replace("{context}", &context)
    }

    /// Judge prompt: is the answer factually consistent with the golden one.
    pub fn correctness(query: &str, answer: &str, golden_answer: &str) -> String {
        fill_judge(CORRECTNESS_TEMPLATE, query, answer, golden_answer)
    }

    /// Judge prompt: does the answer cover all golden information points.
    pub fn completeness(query: &str, answer: &str, golden_answer: &str) -> String {
        fill_judge(COMPLETENESS_TEMPLATE, query, answer, golden_answer)
    }

    /// Judge prompt: is the answer free of hallucination.
    pub fn faithfulness(query: &str, answer: &str, golden_answer: &str) -> String {
        fill_judge(FAITHFULNESS_TEMPLATE, query, answer, golden_answer)
    }
}

fn fill_judge(template: &str, query: &str, answer: &str, golden_answer: &str) -> String {
    template
        .replace("{query}", query)
        .replace("{answer}", answer)
        .replace("{golden_answer}", golden_answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rag_answer_prompt() {
        let passages = vec!["第一段参考".to_string(), "第二段参考".to_string()];
        let prompt = Prompts::rag_answer("注册资本是多少？", &passages);

        assert!(prompt.contains("问题：注册资本是多少？"));
        assert!(prompt.contains("第一段参考\n---\n第二段参考"));
        assert!(prompt.ends_with("请回答：注册资本是多少？"));
    }

    #[test]
    fn test_judge_prompts_are_filled() {
        for prompt in [
            Prompts::correctness("问", "答", "金"),
            Prompts::completeness("问", "答", "金"),
            Prompts::faithfulness("问", "答", "金"),
        ] {
            assert!(prompt.contains("<question>\n问\n</question>"));
            assert!(prompt.contains("<ai_answer>\n答\n</ai_answer>"));
            assert!(prompt.contains("<golden_answer>\n金\n</golden_answer>"));
            assert!(prompt.contains("<result>是</result>"));
            assert!(!prompt.contains("{query}"));
        }
    }
}
