//! Prompt construction for query synthesis.
//!
//! One constrained prompt per question: the exact table name, the typed
//! column list, an instruction set mapping question phrasing to query
//! shape, and worked examples. The examples deliberately use fictitious
//! table names so a small model does not echo an example table instead of
//! the real one.

use crate::schema::TableSchema;

pub fn build_sql_prompt(question: &str, schema: &TableSchema) -> String {
    let table = &schema.name;
    let schema_context = schema.context_string();

    format!(
        r#"[SYSTEM]
You are a Data Analyst Agent.
Your task is to write a SQL query for the table "{table}".

Schema:
{schema_context}

Instructions:
1. Analyze the Request:
   - "Total", "Sum" -> Use SUM(Column)
   - "How many" -> Use COUNT(*) to count items, or SUM(Column) to sum values.
   - "List", "Show", "What is" -> SELECT the column directly (NO SUM/COUNT).
   - "Predict", "Forecast", "Future" -> SELECT *ALL* HISTORICAL data (Date + Value) ordered by Date. Do NOT use LIMIT. The app needs full history to forecast.
2. Check the Schema: Use ONLY the columns listed above. Do not guess column names.
3. Construct the SQL using the EXACT table name "{table}".
4. Output a "Thought" explaining your logic, then the "SQL".

Examples:
(These use FAKE tables. Do not copy them. Use table: "{table}")

Request: "Total sales for Apples"
Thought: The user wants a sum of 'Sales'. They filtered by 'Apples', so I need WHERE Fruit = 'Apples'.
SQL: ```sql
SELECT SUM(Sales) FROM fruit_shop WHERE Fruit = 'Apples';
```

Request: "What is the price of the Red Dress?"
Thought: The user wants a specific value ('Price'), not a sum. They filtered by 'Red Dress'.
SQL: ```sql
SELECT Price FROM products WHERE Item_Name = 'Red Dress';
```

Request: "Predict next month's sales"
Thought: The user wants a forecast. I need full history. I will select Date and Sales from the table "{table}" (NOT sales_data).
SQL: ```sql
SELECT Date, Sales FROM "{table}" ORDER BY Date ASC;
```

Request: "Who has the highest score?"
Thought: The user wants the top student. I should Order By 'Score' DESC and Limit to 1.
SQL: ```sql
SELECT Student_Name FROM student_scores ORDER BY Score DESC LIMIT 1;
```

Current Request:
Question: {question}

Response:
[/SYSTEM]
"#
    )
}
