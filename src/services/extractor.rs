//! 提交解析器 - 业务能力层
//!
//! 从一页渲染结果中解析出 (学生, 代码) 列表。
//!
//! ## 页面结构前提
//!
//! 平台的答题块没有任何归属标记，只能靠顺序对应：
//!
//! - 姓名标签与答题块按文档顺序排列
//! - 每个学生的答题块数量相同（记为 p），且连续排列：
//!   学生 i 拥有第 `[i*p, (i+1)*p)` 个答题块，不交错
//!
//! 平台改变排列方式时，这里的结果会错位而不会报错。

use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::models::{PageSelectors, Submission};
use crate::services::dom_snapshot::{DomSnapshot, PageAccessor};

/// 姓名无法识别时使用的占位名
pub const UNKNOWN_STUDENT: &str = "Unknown Student";
/// 答题块中没有代码容器时记录的内容
pub const CODE_CONTAINER_MISSING: &str = "[Code container not found]";
const PART_SEPARATOR: &str = "---------------------";

/// 单页解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// 正常解析（可能为空）
    Records(Vec<Submission>),
    /// 答题块数量不是姓名数量的整数倍，本页跳过
    StructuralMismatch {
        name_count: usize,
        block_count: usize,
    },
}

impl Extraction {
    pub fn into_records(self) -> Vec<Submission> {
        match self {
            Extraction::Records(records) => records,
            Extraction::StructuralMismatch { .. } => Vec::new(),
        }
    }

    pub fn is_mismatch(&self) -> bool {
        matches!(self, Extraction::StructuralMismatch { .. })
    }
}

/// 一个答题块的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartSlot {
    Present { label: String, code: String },
    /// 计算出的位置上没有答题块
    Missing { index: usize },
}

/// 提交解析器
pub struct Extractor<'s> {
    selectors: &'s PageSelectors,
}

impl<'s> Extractor<'s> {
    pub fn new(selectors: &'s PageSelectors) -> Self {
        Self { selectors }
    }

    /// 解析一段渲染后的 HTML
    pub fn extract_html(&self, html: &str) -> AppResult<Extraction> {
        let snapshot = DomSnapshot::parse(html);
        self.extract(&snapshot)
    }

    /// 从页面中解析所有学生的提交
    pub fn extract<A: PageAccessor>(&self, page: &A) -> AppResult<Extraction> {
        let names = page.query_all(&self.selectors.student_name)?;
        let blocks = page.query_all(&self.selectors.answer_block)?;

        let Some(parts_per_student) = parts_per_student(names.len(), blocks.len()) else {
            warn!(
                "⚠️ 页面结构不一致: {} 个学生, {} 个答题块，无法整除，跳过本页",
                names.len(),
                blocks.len()
            );
            return Ok(Extraction::StructuralMismatch {
                name_count: names.len(),
                block_count: blocks.len(),
            });
        };

        info!(
            "检测到 {} 个学生、{} 个答题块（每人 {} 块）",
            names.len(),
            blocks.len(),
            parts_per_student
        );

        let mut records = Vec::with_capacity(names.len());
        for (student_index, name_element) in names.iter().enumerate() {
            let student_name = parse_student_name(&page.text(*name_element));

            let mut parts = Vec::with_capacity(parts_per_student);
            for (offset, slot) in student_slots(&blocks, student_index, parts_per_student)
                .into_iter()
                .enumerate()
            {
                match slot {
                    Ok(block) => parts.push(self.read_part(page, block, offset, &student_name)?),
                    Err(index) => {
                        warn!(
                            "  - 学生 {} 的第 {} 个答题块缺失（位置 {}）",
                            student_name,
                            offset + 1,
                            index
                        );
                        parts.push(PartSlot::Missing { index });
                    }
                }
            }

            let content = render_content(&parts);
            debug!(
                "  - {} ({}/{}) 内容长度: {}",
                student_name,
                student_index + 1,
                names.len(),
                content.len()
            );
            records.push(Submission::new(student_name, content));
        }

        Ok(Extraction::Records(records))
    }

    fn read_part<'a, A: PageAccessor>(
        &self,
        page: &'a A,
        block: A::Handle<'a>,
        offset: usize,
        student_name: &str,
    ) -> AppResult<PartSlot> {
        let label = page
            .query_within(block, &self.selectors.part_label)?
            .first()
            .map(|el| page.text(*el).trim().to_string())
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| format!("Part {}", offset + 1));

        let code = match page.query_within(block, &self.selectors.code_container)?.first() {
            Some(container) => page
                .query_within(*container, &self.selectors.code_paragraph)?
                .into_iter()
                .map(|p| page.text(p))
                .collect::<Vec<_>>()
                .join("\n")
                .trim_end()
                .to_string(),
            None => {
                warn!("  - 学生 {} 的 {} 没有找到代码容器", student_name, label);
                CODE_CONTAINER_MISSING.to_string()
            }
        };

        Ok(PartSlot::Present { label, code })
    }
}

/// 每个学生的答题块数量；无法整除或小于 1 时返回 None
pub fn parts_per_student(name_count: usize, block_count: usize) -> Option<usize> {
    if name_count == 0 || block_count % name_count != 0 {
        return None;
    }
    let parts = block_count / name_count;
    (parts >= 1).then_some(parts)
}

/// 学生 i 拥有的答题块：`[i*p, (i+1)*p)`，缺失的位置以 `Err(位置)` 表示
pub fn student_slots<T: Copy>(
    blocks: &[T],
    student_index: usize,
    parts_per_student: usize,
) -> Vec<Result<T, usize>> {
    let start = student_index * parts_per_student;
    (start..start + parts_per_student)
        .map(|index| blocks.get(index).copied().ok_or(index))
        .collect()
}

/// 从姓名标签文本中取出学生姓名
///
/// 标签形如 `序号\u{a0}姓名`：按不间断空格切分取第二段，没有则取全文。
pub fn parse_student_name(label_text: &str) -> String {
    let name = label_text
        .split('\u{a0}')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .unwrap_or(label_text)
        .trim();

    if name.is_empty() {
        UNKNOWN_STUDENT.to_string()
    } else {
        name.to_string()
    }
}

/// 拼接一个学生所有答题块的内容
pub fn render_content(parts: &[PartSlot]) -> String {
    let mut combined = String::new();
    for part in parts {
        match part {
            PartSlot::Present { label, code } => {
                combined.push_str(&format!("{}\n{}\n{}\n\n", label, PART_SEPARATOR, code));
            }
            PartSlot::Missing { index } => {
                combined.push_str(&format!("[Part container missing for index {}]\n\n", index));
            }
        }
    }
    combined.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = r#"QuestionWrapperStyledComponents__QuestionContainer-sc-1u752ip-3"#;

    fn name(label: &str) -> String {
        format!(r#"<span data-cy="studentName">{}</span>"#, label)
    }

    fn block(label: Option<&str>, lines: Option<&[&str]>) -> String {
        let label = label
            .map(|l| {
                format!(
                    r#"<span class="QuestionSubLabel__SubLabel-sc-c362p1-0">{}</span>"#,
                    l
                )
            })
            .unwrap_or_default();
        let code = lines
            .map(|lines| {
                let paragraphs: String = lines.iter().map(|l| format!("<p>{}</p>", l)).collect();
                format!(
                    r#"<div class="EssayRichTextPreview__EssayRichTextContainer-sc-tzjrn-0"><div class="MathFormulaDisplay-sc-16rkkq2-0">{}</div></div>"#,
                    paragraphs
                )
            })
            .unwrap_or_default();
        format!(
            r#"<div class="{}" data-cy="question-container">{}{}</div>"#,
            BLOCK, label, code
        )
    }

    fn page(names: &[String], blocks: &[String]) -> String {
        format!(
            "<html><body><div>{}</div><div>{}</div></body></html>",
            names.concat(),
            blocks.concat()
        )
    }

    fn extract(html: &str) -> Extraction {
        let selectors = PageSelectors::default();
        Extractor::new(&selectors).extract_html(html).unwrap()
    }

    #[test]
    fn test_parts_per_student_partition_rule() {
        assert_eq!(parts_per_student(2, 4), Some(2));
        assert_eq!(parts_per_student(3, 3), Some(1));
        assert_eq!(parts_per_student(2, 3), None);
        assert_eq!(parts_per_student(3, 0), None);
        assert_eq!(parts_per_student(0, 4), None);
        assert_eq!(parts_per_student(0, 0), None);
    }

    #[test]
    fn test_partition_invariant_over_small_grid() {
        for n in 1..=4usize {
            for k in 0..=12usize {
                let names: Vec<String> = (0..n)
                    .map(|i| name(&format!("{}\u{a0}S{}", i + 1, i)))
                    .collect();
                let blocks: Vec<String> = (0..k).map(|_| block(Some("a"), Some(&["x"]))).collect();
                let records = extract(&page(&names, &blocks)).into_records();

                let expect_records = k % n == 0 && k / n >= 1;
                assert_eq!(!records.is_empty(), expect_records, "n={} k={}", n, k);
            }
        }
    }

    #[test]
    fn test_block_ownership_two_students_two_parts() {
        let html = page(
            &[name("1\u{a0}Alice Smith"), name("2\u{a0}Bob Jones")],
            &[
                block(Some("a"), Some(&["alice-part-a"])),
                block(Some("b"), Some(&["alice-part-b"])),
                block(Some("a"), Some(&["bob-part-a"])),
                block(Some("b"), Some(&["bob-part-b"])),
            ],
        );

        let records = extract(&html).into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].student_name, "Alice Smith");
        assert_eq!(records[1].student_name, "Bob Jones");

        assert!(records[0].content.contains("alice-part-a"));
        assert!(records[0].content.contains("alice-part-b"));
        assert!(!records[0].content.contains("bob"));
        assert!(!records[1].content.contains("alice"));
    }

    #[test]
    fn test_content_format() {
        let html = page(
            &[name("1\u{a0}Alice")],
            &[
                block(Some("a"), Some(&["public interface Bell {", "  void ring();", "}"])),
                block(None, Some(&["class X {}"])),
            ],
        );

        let records = extract(&html).into_records();
        assert_eq!(
            records[0].content,
            "a\n---------------------\npublic interface Bell {\n  void ring();\n}\n\n\
             Part 2\n---------------------\nclass X {}"
        );
    }

    #[test]
    fn test_missing_code_container_placeholder() {
        let html = page(&[name("1\u{a0}Alice")], &[block(Some("a"), None)]);

        let records = extract(&html).into_records();
        assert_eq!(
            records[0].content,
            format!("a\n---------------------\n{}", CODE_CONTAINER_MISSING)
        );
    }

    #[test]
    fn test_structural_mismatch_is_reported() {
        let html = page(
            &[name("1\u{a0}A"), name("2\u{a0}B")],
            &vec![block(Some("a"), Some(&["x"])); 3],
        );

        assert_eq!(
            extract(&html),
            Extraction::StructuralMismatch {
                name_count: 2,
                block_count: 3
            }
        );
    }

    #[test]
    fn test_missing_block_placeholder_references_index() {
        let blocks = [10, 11, 12];
        let slots = student_slots(&blocks, 1, 2);
        assert_eq!(slots, vec![Ok(12), Err(3)]);

        let parts = vec![
            PartSlot::Present {
                label: "a".to_string(),
                code: "x".to_string(),
            },
            PartSlot::Missing { index: 3 },
        ];
        let content = render_content(&parts);
        assert!(content.contains("[Part container missing for index 3]"));
        assert!(content.starts_with("a\n---------------------\nx"));
    }

    #[test]
    fn test_parse_student_name() {
        assert_eq!(parse_student_name("12\u{a0}Grace Hopper"), "Grace Hopper");
        assert_eq!(parse_student_name("  Grace Hopper  "), "Grace Hopper");
        assert_eq!(parse_student_name("12\u{a0}"), "12");
        assert_eq!(parse_student_name(""), UNKNOWN_STUDENT);
        assert_eq!(parse_student_name("\u{a0}\u{a0}"), UNKNOWN_STUDENT);
    }
}
