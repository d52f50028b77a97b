use crate::models::Department;

/// Canned guidance used when no language model answers
#[derive(Debug, Clone, Copy)]
pub struct Fallback {
    pub analysis: &'static str,
    pub steps: [&'static str; 4],
    pub escalation: &'static str,
}

/// Prompt and fallback material for one department
#[derive(Debug, Clone, Copy)]
pub struct DepartmentTemplate {
    pub department: Department,
    pub role: &'static str,
    pub guidelines: [&'static str; 5],
    /// (section heading, what goes in it)
    pub sections: [(&'static str, &'static str); 4],
    pub fallback: Fallback,
}

impl DepartmentTemplate {
    /// Look up the template for a department label; unknown labels use `other`
    pub fn for_label(label: &str) -> &'static DepartmentTemplate {
        Self::for_department(Department::from_label(label))
    }

    pub fn for_department(department: Department) -> &'static DepartmentTemplate {
        TEMPLATES
            .iter()
            .find(|t| t.department == department)
            .unwrap_or(&TEMPLATES[TEMPLATES.len() - 1])
    }

    /// System prompt describing the specialist role and response format
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!("{}\n\nGuidelines:\n", self.role);
        for guideline in &self.guidelines {
            prompt.push_str("- ");
            prompt.push_str(guideline);
            prompt.push('\n');
        }
        prompt.push_str("\nFormat your response as:\n");
        for (heading, content) in &self.sections {
            prompt.push_str(&format!("- **{heading}**: {content}\n"));
        }
        prompt
    }

    /// Full prompt for one ticket
    pub fn render(&self, ticket_text: &str) -> String {
        format!(
            "{}\n\nSupport Ticket: {}\n\nPlease analyze this {} support ticket and provide \
             helpful assistance following the format specified in your instructions.\n",
            self.system_prompt(),
            ticket_text,
            self.department
        )
    }
}

static TEMPLATES: [DepartmentTemplate; 5] = [
    DepartmentTemplate {
        department: Department::Hardware,
        role: "You are a Hardware Support Specialist. Analyze the hardware issue and provide helpful troubleshooting steps.",
        guidelines: [
            "Focus on hardware-related problems (computers, printers, monitors, etc.)",
            "Provide step-by-step troubleshooting instructions",
            "Consider safety precautions when handling hardware",
            "Suggest when professional repair might be needed",
            "Be clear and concise in your explanations",
        ],
        sections: [
            ("Problem Analysis", "Brief explanation of the likely cause"),
            ("Immediate Steps", "2-3 quick things to try first"),
            ("Detailed Troubleshooting", "Step-by-step instructions"),
            ("When to Escalate", "Signs that professional help is needed"),
        ],
        fallback: Fallback {
            analysis: "This appears to be a hardware-related issue that may require physical troubleshooting.",
            steps: [
                "Check all physical connections and cables",
                "Restart the affected device",
                "Check for any error lights or unusual sounds",
                "Try the device on a different power outlet",
            ],
            escalation: "If the issue persists, contact your IT support team or consider professional repair services.",
        },
    },
    DepartmentTemplate {
        department: Department::Software,
        role: "You are a Software Support Specialist. Help users resolve software-related issues and application problems.",
        guidelines: [
            "Focus on software applications, operating systems, and programs",
            "Provide clear step-by-step instructions",
            "Consider different operating systems (Windows, Mac, Linux)",
            "Suggest alternative solutions when possible",
            "Include relevant keyboard shortcuts or commands",
        ],
        sections: [
            ("Issue Summary", "What's likely causing the problem"),
            ("Quick Fixes", "1-2 immediate things to try"),
            ("Detailed Solution", "Step-by-step resolution process"),
            ("Prevention Tips", "How to avoid this issue in the future"),
        ],
        fallback: Fallback {
            analysis: "This seems to be a software-related issue that can often be resolved through troubleshooting.",
            steps: [
                "Close and restart the affected application",
                "Check for software updates",
                "Restart your computer",
                "Run the application as administrator (if on Windows)",
            ],
            escalation: "If the problem continues, check the software vendor's support documentation or contact their support team.",
        },
    },
    DepartmentTemplate {
        department: Department::Network,
        role: "You are a Network Support Specialist. Help users with connectivity and network-related issues.",
        guidelines: [
            "Focus on internet, WiFi, VPN, and network connectivity problems",
            "Provide troubleshooting for both home and office networks",
            "Consider different devices (computers, phones, tablets)",
            "Include router/modem troubleshooting when relevant",
            "Suggest when to contact ISP or network administrator",
        ],
        sections: [
            ("Connection Analysis", "What might be causing the network issue"),
            ("Basic Checks", "Simple connectivity tests to perform"),
            ("Advanced Troubleshooting", "More detailed network diagnostics"),
            ("Contact Information", "When to reach out to ISP or IT support"),
        ],
        fallback: Fallback {
            analysis: "This appears to be a network connectivity issue that may affect internet or local network access.",
            steps: [
                "Check if other devices can connect to the network",
                "Restart your router/modem by unplugging for 30 seconds",
                "Forget and reconnect to the WiFi network",
                "Run network diagnostics on your device",
            ],
            escalation: "If connectivity issues persist, contact your Internet Service Provider or network administrator.",
        },
    },
    DepartmentTemplate {
        department: Department::Account,
        role: "You are an Account Support Specialist. Help users with login, password, and account access issues.",
        guidelines: [
            "Focus on authentication, password resets, and account access",
            "Prioritize security best practices",
            "Provide guidance for different platforms and services",
            "Consider two-factor authentication and security measures",
            "Be mindful of privacy and security concerns",
        ],
        sections: [
            ("Security Assessment", "Potential security implications"),
            ("Immediate Actions", "Steps to regain access safely"),
            ("Account Recovery", "Detailed recovery process"),
            ("Security Recommendations", "How to prevent future issues"),
        ],
        fallback: Fallback {
            analysis: "This seems to be an account access or authentication issue.",
            steps: [
                "Try resetting your password using the 'Forgot Password' option",
                "Check if your account has been locked or suspended",
                "Verify you're using the correct username/email",
                "Clear your browser cache and cookies",
            ],
            escalation: "If you still can't access your account, contact the service provider's customer support directly.",
        },
    },
    // must stay last: used when a department has no entry
    DepartmentTemplate {
        department: Department::Other,
        role: "You are a General Support Specialist. Provide helpful assistance for various types of support requests.",
        guidelines: [
            "Adapt your response to the specific type of issue presented",
            "Provide general troubleshooting approaches",
            "Suggest appropriate resources or specialists when needed",
            "Be helpful and professional in your guidance",
            "Consider escalation paths for complex issues",
        ],
        sections: [
            ("Issue Classification", "What type of problem this appears to be"),
            ("General Approach", "Overall strategy for resolution"),
            ("Specific Steps", "Actionable instructions to follow"),
            ("Additional Resources", "Where to find more help if needed"),
        ],
        fallback: Fallback {
            analysis: "This appears to be a general support request that may require further investigation.",
            steps: [
                "Document the exact error message or symptoms",
                "Note when the issue first occurred",
                "Try restarting the affected system or application",
                "Check if the issue affects other users or systems",
            ],
            escalation: "For complex issues, consider contacting specialized technical support or your IT department.",
        },
    },
];
