//! 目标页面的 CSS 选择器集合
//!
//! 默认值对应评分平台"按题查看"页面的渲染结构，可通过配置文件覆盖。

use serde::{Deserialize, Serialize};

/// 页面选择器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSelectors {
    /// 学生姓名标签
    pub student_name: String,
    /// 单个答题块容器（一个学生的一道小题）
    pub answer_block: String,
    /// 小题标签（a、b…），相对答题块
    pub part_label: String,
    /// 代码容器，相对答题块
    pub code_container: String,
    /// 代码段落，相对代码容器
    pub code_paragraph: String,
    /// 懒渲染占位元素
    pub render_placeholder: String,
    /// 分页按钮模板，`{page}` 会被替换为目标页码
    pub page_link_template: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            student_name: r#"[data-cy="studentName"]"#.to_string(),
            answer_block: r#".QuestionWrapperStyledComponents__QuestionContainer-sc-1u752ip-3[data-cy="question-container"]"#
                .to_string(),
            part_label: ".QuestionSubLabel__SubLabel-sc-c362p1-0".to_string(),
            code_container: ".EssayRichTextPreview__EssayRichTextContainer-sc-tzjrn-0".to_string(),
            code_paragraph: ".MathFormulaDisplay-sc-16rkkq2-0 p".to_string(),
            render_placeholder: ".renderIfVisible-placeholder".to_string(),
            page_link_template: ".ant-pagination-item-{page} a".to_string(),
        }
    }
}

impl PageSelectors {
    /// 指定页码的分页按钮选择器
    pub fn page_link(&self, page_number: u32) -> String {
        self.page_link_template
            .replace("{page}", &page_number.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_link_substitutes_number() {
        let selectors = PageSelectors::default();
        assert_eq!(selectors.page_link(3), ".ant-pagination-item-3 a");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let selectors: PageSelectors =
            toml::from_str(r#"student_name = ".name""#).expect("解析失败");
        assert_eq!(selectors.student_name, ".name");
        assert_eq!(selectors.part_label, PageSelectors::default().part_label);
    }
}
