// ==========================================
// 种子数据导入引擎 - 种子文件加载器
// ==========================================
// 支持: JSON (.json) / CSV (.csv) / Excel (.xlsx)
// 路径: <root>/<kind>/<file_name>.<ext>
// ==========================================

use crate::domain::{SeedKind, SeedRecord, STABLE_ID_FIELD};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::SeedLoader;
use calamine::{open_workbook, Data, Reader, Xlsx};
use csv::ReaderBuilder;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 按优先级尝试的扩展名
const SUPPORTED_EXTENSIONS: [&str; 3] = ["json", "csv", "xlsx"];

// ==========================================
// FileSeedLoader - 基于目录的种子加载器
// ==========================================
#[derive(Debug, Clone)]
pub struct FileSeedLoader {
    root: PathBuf,
}

impl FileSeedLoader {
    /// # 参数
    /// - root: 种子数据根目录（下含 baseline/ 与 demo/）
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 定位种子文件（json 优先，其次 csv、xlsx）
    pub fn locate(&self, kind: SeedKind, file_name: &str) -> ImportResult<PathBuf> {
        let dir = self.root.join(kind.dir_name());
        SUPPORTED_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", file_name, ext)))
            .find(|path| path.is_file())
            .ok_or_else(|| {
                ImportError::SeedFileNotFound(dir.join(file_name).display().to_string())
            })
    }

    /// 解析任意受支持格式的文件为属性包序列（不做 stableId 校验）
    pub fn parse_file(path: &Path) -> ImportResult<Vec<Map<String, Value>>> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "json" => parse_json(path),
            "csv" => parse_csv(path),
            "xlsx" => parse_xlsx(path),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

impl SeedLoader for FileSeedLoader {
    fn load_seed_file(&self, kind: SeedKind, file_name: &str) -> ImportResult<Vec<SeedRecord>> {
        let path = self.locate(kind, file_name)?;
        let items = Self::parse_file(&path)?;
        let records = into_seed_records(&path.display().to_string(), items)?;
        debug!(path = %path.display(), count = records.len(), "种子文件加载完成");
        Ok(records)
    }
}

// ==========================================
// 格式解析
// ==========================================

fn parse_json(path: &Path) -> ImportResult<Vec<Map<String, Value>>> {
    let file = File::open(path)?;
    let root: Value = serde_json::from_reader(std::io::BufReader::new(file))?;
    let file_label = path.display().to_string();

    let Value::Array(items) = root else {
        return Err(ImportError::NotAnArray { file: file_label });
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(ImportError::InvalidItem {
                file: file_label.clone(),
                index,
            }),
        })
        .collect()
}

fn parse_csv(path: &Path) -> ImportResult<Vec<Map<String, Value>>> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let cells = headers
            .iter()
            .zip(record.iter())
            .map(|(header, raw)| decode_text_cell(header, raw));
        if let Some(row) = build_row(&headers, cells) {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn parse_xlsx(path: &Path) -> ImportResult<Vec<Map<String, Value>>> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e: calamine::XlsxError| ImportError::ExcelParseError(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();

    Ok(rows
        .filter_map(|data_row| {
            let cells = headers
                .iter()
                .zip(data_row.iter())
                .map(|(header, cell)| decode_xlsx_cell(header, cell));
            build_row(&headers, cells)
        })
        .collect())
}

/// 表头 + 已解码单元格 → 属性包；整行空白返回 None
fn build_row(headers: &[String], cells: impl Iterator<Item = Value>) -> Option<Map<String, Value>> {
    let mut row = Map::new();
    for (header, cell) in headers.iter().zip(cells) {
        if header.is_empty() {
            continue;
        }
        row.insert(header.clone(), cell);
    }

    if row.values().all(Value::is_null) {
        None
    } else {
        Some(row)
    }
}

/// 文本单元格解码；stableId 列始终保留为字符串
fn decode_text_cell(header: &str, raw: &str) -> Value {
    if header == STABLE_ID_FIELD {
        let trimmed = raw.trim();
        return if trimmed.is_empty() {
            Value::Null
        } else {
            Value::String(trimmed.to_string())
        };
    }
    parse_cell(raw)
}

/// Excel 单元格解码
///
/// # 规则
/// - 数值/布尔按类型映射（整数值的浮点数写为整数，与 JSON 种子一致）
/// - 文本按 parse_cell 规则
/// - 日期等其他类型 → 显示文本
fn decode_xlsx_cell(header: &str, cell: &Data) -> Value {
    if header == STABLE_ID_FIELD {
        return decode_text_cell(header, &cell.to_string());
    }
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => parse_cell(s),
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Value::from(*f as i64),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        other => Value::String(other.to_string()),
    }
}

/// 单元格文本 → JSON 值
///
/// # 规则
/// - 空白 → null
/// - 合法 JSON 文本（数字、true/false、null、数组、对象）→ 对应类型的值
/// - 其他 → 去除首尾空白的字符串
fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str::<Value>(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

// ==========================================
// stableId 校验
// ==========================================

/// 属性包 → SeedRecord
///
/// # 校验
/// - 每项必须带非空字符串 stableId
/// - 同一文件内 stableId 不得重复
pub fn into_seed_records(
    file_label: &str,
    items: Vec<Map<String, Value>>,
) -> ImportResult<Vec<SeedRecord>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::with_capacity(items.len());

    for (index, attributes) in items.into_iter().enumerate() {
        let stable_id = match attributes.get(STABLE_ID_FIELD) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => {
                return Err(ImportError::MissingStableId {
                    file: file_label.to_string(),
                    index,
                })
            }
        };

        if !seen.insert(stable_id.clone()) {
            return Err(ImportError::DuplicateStableId {
                file: file_label.to_string(),
                stable_id,
            });
        }

        records.push(SeedRecord::new(stable_id, attributes));
    }

    Ok(records)
}
