//! Header resolution - maps drifting column names onto semantic fields

use std::collections::HashMap;
use std::fmt;

use crate::domain::result::{Error, Result};
use crate::domain::SourceFormat;

/// Semantic column of a settlement export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    OrderId,
    ProductName,
    SettlementAmount,
    TotalRevenue,
    OrderAmount,
    UnitCost,
    Quantity,
    CreatedDate,
    SettledDate,
    Variation,
    RefundSubtotal,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::OrderId => "order id",
            Field::ProductName => "product name",
            Field::SettlementAmount => "settlement amount",
            Field::TotalRevenue => "total revenue",
            Field::OrderAmount => "order amount",
            Field::UnitCost => "unit cost",
            Field::Quantity => "quantity",
            Field::CreatedDate => "created date",
            Field::SettledDate => "settled date",
            Field::Variation => "variation",
            Field::RefundSubtotal => "refund subtotal",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Aliases of one field within a layout
#[derive(Debug)]
pub struct FieldAliases {
    pub field: Field,
    /// Exact names, best first (compared case/whitespace-insensitively)
    pub exact: &'static [&'static str],
    /// Keyword groups; a column matches when it contains every fragment
    pub fragments: &'static [&'static [&'static str]],
    /// Header is unusable without this column
    pub required: bool,
}

/// Column vocabulary of one export layout
#[derive(Debug)]
pub struct Layout {
    pub format: SourceFormat,
    pub fields: &'static [FieldAliases],
    /// At least one of these must be present
    pub one_of: &'static [Field],
}

/// Keyword signature used to find a header row below a metadata banner
#[derive(Debug)]
pub struct HeaderSignature {
    pub all: &'static [&'static str],
    pub any: &'static [&'static str],
}

impl HeaderSignature {
    /// True if the lowercase joined row text carries the signature
    pub fn matches(&self, row_text: &str) -> bool {
        let lower = row_text.to_lowercase();
        self.all.iter().all(|k| lower.contains(k))
            && (self.any.is_empty() || self.any.iter().any(|k| lower.contains(k)))
    }
}

/// TikTok Shop "All Orders" CSV
pub static TIKTOK_ORDERS: Layout = Layout {
    format: SourceFormat::TikTokOrders,
    fields: &[
        FieldAliases { field: Field::OrderId, exact: &["Order ID", "order_id"], fragments: &[], required: false },
        FieldAliases {
            field: Field::ProductName,
            exact: &["Product Name", "product_name"],
            fragments: &[&["product", "name"]],
            required: true,
        },
        FieldAliases { field: Field::Variation, exact: &["Variation", "SKU Name"], fragments: &[], required: false },
        FieldAliases { field: Field::Quantity, exact: &["Quantity", "Qty"], fragments: &[], required: true },
        FieldAliases {
            field: Field::UnitCost,
            exact: &["SKU Unit Original Price", "Unit Price"],
            fragments: &[&["unit", "original price"]],
            required: false,
        },
        FieldAliases {
            field: Field::OrderAmount,
            exact: &["Order Amount", "order_amount"],
            fragments: &[&["order", "amount"]],
            required: true,
        },
        FieldAliases {
            field: Field::CreatedDate,
            exact: &["Created Time", "Order Created Time"],
            fragments: &[&["created", "time"]],
            required: false,
        },
    ],
    one_of: &[],
};

/// TikTok Shop income/settlement workbook (header on the first row)
pub static TIKTOK_INCOME: Layout = Layout {
    format: SourceFormat::TikTokIncome,
    fields: &[
        FieldAliases {
            field: Field::OrderId,
            exact: &["Order/adjustment ID", "Order ID", "ID pesanan", "order_id", "OrderID"],
            fragments: &[&["order", "adjustment id"]],
            required: false,
        },
        FieldAliases {
            field: Field::ProductName,
            exact: &["Product name", "Nama produk", "product_name", "ProductName"],
            fragments: &[],
            required: false,
        },
        FieldAliases {
            field: Field::SettlementAmount,
            exact: &[
                "Total settlement amount",
                "Jumlah penyelesaian total",
                "Settlement Amount",
                "settlement_amount",
            ],
            fragments: &[&["settlement", "amount"], &["jumlah", "penyelesaian"]],
            required: true,
        },
        FieldAliases {
            field: Field::TotalRevenue,
            exact: &["Total Revenue", "total_revenue"],
            fragments: &[],
            required: false,
        },
        FieldAliases { field: Field::Quantity, exact: &["Quantity", "Kuantitas", "Qty"], fragments: &[], required: false },
        FieldAliases {
            field: Field::CreatedDate,
            exact: &[
                "Order created time",
                "Waktu pembuatan pesanan",
                "Created Time",
                "created_time",
                "Date",
            ],
            fragments: &[],
            required: false,
        },
        FieldAliases {
            field: Field::SettledDate,
            exact: &["Order settled time", "Waktu penyelesaian pesanan", "Settled Time"],
            fragments: &[&["settled", "time"]],
            required: false,
        },
        FieldAliases {
            field: Field::Variation,
            exact: &["Variation", "Variasi", "SKU name"],
            fragments: &[],
            required: false,
        },
        FieldAliases {
            field: Field::RefundSubtotal,
            exact: &[
                "Refund subtotal after seller discounts",
                "refund_subtotal_after_seller_discounts",
                "Refund Subtotal",
                "refund_subtotal",
            ],
            fragments: &[&["refund subtotal"]],
            required: false,
        },
    ],
    one_of: &[Field::OrderId, Field::ProductName],
};

/// Shopee income workbook (header sits below a metadata banner)
pub static SHOPEE_INCOME: Layout = Layout {
    format: SourceFormat::ShopeeIncome,
    fields: &[
        FieldAliases {
            field: Field::OrderId,
            exact: &["No. Pesanan", "Order Number"],
            fragments: &[&["no", "pesanan"], &["order", "number"]],
            required: true,
        },
        FieldAliases {
            field: Field::SettledDate,
            exact: &["Tanggal Dana Dilepaskan", "Release Date"],
            fragments: &[&["tanggal", "dilepas"], &["tanggal", "dana"], &["release", "date"]],
            required: true,
        },
        FieldAliases {
            field: Field::SettlementAmount,
            exact: &["Total Penghasilan", "Total Income"],
            fragments: &[
                &["total", "penghasilan"],
                &["total", "income"],
                &["total diskon penjual"],
                &["penghasilan penjual"],
            ],
            required: true,
        },
    ],
    one_of: &[],
};

/// Header row signature of the Shopee income workbook
pub static SHOPEE_HEADER: HeaderSignature = HeaderSignature {
    all: &["no.", "pesanan"],
    any: &["tanggal", "dana"],
};

/// Lowercase and collapse whitespace
pub fn normalize_header(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Field → column index for one decoded table
#[derive(Debug, Clone, Default)]
pub struct ResolvedHeader {
    columns: HashMap<Field, usize>,
}

impl ResolvedHeader {
    pub fn index(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn has(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Match column names against a layout.
///
/// For each field the first exact alias present wins, then the first
/// fragment group that some column fully contains.
pub fn resolve(columns: &[String], layout: &Layout) -> ResolvedHeader {
    let normalized: Vec<String> = columns.iter().map(|c| normalize_header(c)).collect();
    let mut resolved = ResolvedHeader::default();

    for aliases in layout.fields {
        let exact = aliases.exact.iter().find_map(|alias| {
            let alias = normalize_header(alias);
            normalized.iter().position(|c| *c == alias)
        });

        let found = exact.or_else(|| {
            aliases.fragments.iter().find_map(|group| {
                normalized
                    .iter()
                    .position(|c| !c.is_empty() && group.iter().all(|frag| c.contains(frag)))
            })
        });

        if let Some(idx) = found {
            resolved.columns.insert(aliases.field, idx);
        }
    }

    resolved
}

/// Required fields of the layout that the header lacks
pub fn missing_required(resolved: &ResolvedHeader, layout: &Layout) -> Vec<Field> {
    let mut missing: Vec<Field> = layout
        .fields
        .iter()
        .filter(|a| a.required && !resolved.has(a.field))
        .map(|a| a.field)
        .collect();

    if !layout.one_of.is_empty() && !layout.one_of.iter().any(|f| resolved.has(*f)) {
        missing.extend(layout.one_of.iter().copied());
    }
    missing
}

/// Resolve and fail with a source-format error when required columns are absent
pub fn resolve_required(columns: &[String], layout: &Layout) -> Result<ResolvedHeader> {
    let resolved = resolve(columns, layout);
    let missing = missing_required(&resolved, layout);
    if missing.is_empty() {
        return Ok(resolved);
    }

    let names: Vec<&str> = missing.iter().map(|f| f.label()).collect();
    let available: Vec<&str> = columns.iter().map(|c| c.trim()).filter(|c| !c.is_empty()).collect();
    Err(Error::source_format(format!(
        "missing required columns: {} (available: {})",
        names.join(", "),
        available.join(", ")
    )))
}
