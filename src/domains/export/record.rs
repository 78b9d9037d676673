/// Field separator used by the header and every record line.
pub const DELIMITER: &str = "    ";

/// Columns of a data file, in the order the downstream ingester reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    RequestExecutionId,
    Id340B,
    Pid,
    AccountNumber,
    AccountType,
    Ndc,
    TotalPkgs,
    ContractPharmacyAccountNumber,
    CreditRequestType,
    CreditRequestNumber,
    CreditRequestLine,
    CreditMemoType,
    CreditMemoPo,
    CreditMemoNumber,
    CreditMemoLine,
    MaterialNumber,
    MaterialDescription,
    MaterialStatus,
    RetailPrice,
    CreditQty,
    ReferenceInvoiceDate,
    CoveredEntityAccountNumber,
    DebitRequestType,
    DebitRequestNumber,
    DebitRequestLine,
    DebitMemoType,
    DebitMemoPo,
    DebitMemoNumber,
    DebitMemoLine,
    DebitQty,
    Price340B,
    DepartmentCode,
    PackageUom,
    AlternateUom,
    AlternateUomQty,
    UpcNumber,
    RetailWarehouse,
    ReasonCode,
    VrrMessage,
}

pub const COLUMN_COUNT: usize = 39;

impl Column {
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::RequestExecutionId,
        Column::Id340B,
        Column::Pid,
        Column::AccountNumber,
        Column::AccountType,
        Column::Ndc,
        Column::TotalPkgs,
        Column::ContractPharmacyAccountNumber,
        Column::CreditRequestType,
        Column::CreditRequestNumber,
        Column::CreditRequestLine,
        Column::CreditMemoType,
        Column::CreditMemoPo,
        Column::CreditMemoNumber,
        Column::CreditMemoLine,
        Column::MaterialNumber,
        Column::MaterialDescription,
        Column::MaterialStatus,
        Column::RetailPrice,
        Column::CreditQty,
        Column::ReferenceInvoiceDate,
        Column::CoveredEntityAccountNumber,
        Column::DebitRequestType,
        Column::DebitRequestNumber,
        Column::DebitRequestLine,
        Column::DebitMemoType,
        Column::DebitMemoPo,
        Column::DebitMemoNumber,
        Column::DebitMemoLine,
        Column::DebitQty,
        Column::Price340B,
        Column::DepartmentCode,
        Column::PackageUom,
        Column::AlternateUom,
        Column::AlternateUomQty,
        Column::UpcNumber,
        Column::RetailWarehouse,
        Column::ReasonCode,
        Column::VrrMessage,
    ];

    pub fn header_name(&self) -> &'static str {
        match self {
            Column::RequestExecutionId => "RequestExecutionID",
            Column::Id340B => "340B_ID",
            Column::Pid => "PID",
            Column::AccountNumber => "Account_Number",
            Column::AccountType => "Account_Type",
            Column::Ndc => "NDC",
            Column::TotalPkgs => "Total_Pkgs",
            Column::ContractPharmacyAccountNumber => "Contract_Pharmacy_Account_Number",
            Column::CreditRequestType => "Credit_Request_Type",
            Column::CreditRequestNumber => "Credit_Request_Number",
            Column::CreditRequestLine => "Credit_Request_Line",
            Column::CreditMemoType => "Credit_Memo_Type",
            Column::CreditMemoPo => "Credit_Memo_PO",
            Column::CreditMemoNumber => "Credit_Memo_Number",
            Column::CreditMemoLine => "Credit_Memo_Line",
            Column::MaterialNumber => "Material_Number",
            Column::MaterialDescription => "Material_Description",
            Column::MaterialStatus => "Material_Status",
            Column::RetailPrice => "Retail_Price",
            Column::CreditQty => "Credit_Qty",
            Column::ReferenceInvoiceDate => "Reference_Invoice_Date",
            Column::CoveredEntityAccountNumber => "Covered_Entity_Account_Number",
            Column::DebitRequestType => "Debit_Request_Type",
            Column::DebitRequestNumber => "Debit_Request_Number",
            Column::DebitRequestLine => "Debit_Request_Line",
            Column::DebitMemoType => "Debit_Memo_Type",
            Column::DebitMemoPo => "Debit_Memo_PO",
            Column::DebitMemoNumber => "Debit_Memo_Number",
            Column::DebitMemoLine => "Debit_Memo_Line",
            Column::DebitQty => "Debit_Qty",
            Column::Price340B => "340B_Price",
            Column::DepartmentCode => "Department_Code",
            Column::PackageUom => "Package_UOM",
            Column::AlternateUom => "Alternate_UOM",
            Column::AlternateUomQty => "Alternate_UOM_Qty",
            Column::UpcNumber => "UPC_Number",
            Column::RetailWarehouse => "Retail_Warehouse",
            Column::ReasonCode => "Reason_Code",
            Column::VrrMessage => "VRR_Message",
        }
    }

    /// Position of the column in a record line.
    pub fn position(&self) -> usize {
        *self as usize
    }

    pub fn from_header(name: &str) -> Option<Column> {
        Column::ALL
            .iter()
            .copied()
            .find(|c| c.header_name().eq_ignore_ascii_case(name))
    }
}

pub fn header_line() -> String {
    Column::ALL
        .iter()
        .map(Column::header_name)
        .collect::<Vec<_>>()
        .join(DELIMITER)
}

/// One exported row, addressable by column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    values: Vec<String>,
}

impl Default for NormalizedRecord {
    fn default() -> Self {
        Self { values: vec![String::new(); COLUMN_COUNT] }
    }
}

impl NormalizedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: Column, value: impl Into<String>) {
        self.values[column.position()] = value.into();
    }

    pub fn get(&self, column: Column) -> &str {
        &self.values[column.position()]
    }

    /// Record line without the trailing newline.
    pub fn to_line(&self) -> String {
        self.values.join(DELIMITER)
    }

    /// Append the record line and a newline to `buf`.
    pub fn write_line(&self, buf: &mut String) {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                buf.push_str(DELIMITER);
            }
            buf.push_str(value);
        }
        buf.push('\n');
    }
}
