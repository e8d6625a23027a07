//! Bundled sample corpus.
//!
//! Ten labeled questions per department, enough to train every model and to
//! bootstrap an engine that has nothing saved yet.

use crate::department::Department;

const SAMPLE_QUESTIONS: [(Department, [&str; 10]); Department::COUNT] = [
    (
        Department::HR,
        [
            "How do I request vacation days?",
            "What is the company policy on sick leave?",
            "How do I update my personal information?",
            "What are the employee benefits?",
            "How do I report workplace harassment?",
            "What is the dress code policy?",
            "How do I schedule a performance review?",
            "What training programs are available?",
            "How do I submit my timesheet?",
            "What is the remote work policy?",
        ],
    ),
    (
        Department::Finance,
        [
            "How do I submit an expense report?",
            "What is the budget for my department?",
            "How do I request a budget increase?",
            "What are the payment terms for vendors?",
            "How do I process an invoice?",
            "What is the company's fiscal year?",
            "How do I get reimbursed for business expenses?",
            "What is the procedure for purchasing equipment?",
            "How do I track project costs?",
            "What are the tax implications of this expense?",
        ],
    ),
    (
        Department::IT,
        [
            "How do I reset my password?",
            "My computer is running slowly, what should I do?",
            "How do I install new software?",
            "What is the VPN setup process?",
            "How do I backup my files?",
            "My email is not working, can you help?",
            "How do I access the company network remotely?",
            "What antivirus software should I use?",
            "How do I set up a printer?",
            "How do I update my operating system?",
        ],
    ),
    (
        Department::Production,
        [
            "What is the manufacturing schedule?",
            "How do I report a quality issue?",
            "What are the safety protocols?",
            "How do I request materials for production?",
            "What is the maintenance schedule?",
            "How do I report equipment downtime?",
            "What are the production targets?",
            "How do I access the production reports?",
            "What is the procedure for equipment calibration?",
            "How do I report a workplace accident?",
        ],
    ),
    (
        Department::Sales,
        [
            "How do I access the CRM system?",
            "What is the sales target for this quarter?",
            "How do I create a customer proposal?",
            "What are the current pricing guidelines?",
            "How do I track my sales performance?",
            "What marketing materials are available?",
            "How do I schedule a client meeting?",
            "What is the commission structure?",
            "How do I handle customer complaints?",
            "What are the territory assignments?",
        ],
    ),
];

const TEST_QUESTIONS: [&str; 5] = [
    "How can I change my health insurance?",
    "What is my quarterly budget allocation?",
    "I forgot my login credentials",
    "When is the next production run scheduled?",
    "How do I contact our biggest client?",
];

/// The 50 labeled sample questions as parallel `(questions, departments)`
/// lists, grouped by department.
pub fn training_set() -> (Vec<&'static str>, Vec<&'static str>) {
    SAMPLE_QUESTIONS
        .iter()
        .flat_map(|(department, questions)| {
            questions.iter().map(move |&q| (q, department.name()))
        })
        .unzip()
}

/// Unlabeled test questions, one per department.
pub fn test_questions() -> Vec<&'static str> {
    TEST_QUESTIONS.to_vec()
}
